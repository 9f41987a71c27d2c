//! User-Agent string sent with every repository request.
//!
//! Repository operators can identify mirror traffic by product and version.

/// Product token for User-Agent identification.
const PRODUCT: &str = "offliner";

/// Default User-Agent for repository requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version}")
}
