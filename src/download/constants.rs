//! Constants for the download module (timeouts).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default per-attempt timeout (5 minutes for large artifacts).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Suffix of the temporary file a body is streamed into before being renamed
/// onto its mirror path.
pub const PARTIAL_SUFFIX: &str = ".part";
