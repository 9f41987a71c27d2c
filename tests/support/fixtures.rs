//! Fixture repository content served by wiremock.

use offliner_core::ChecksumKind;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const JAR_PATH: &str = "org/example/demo/1.0/demo-1.0.jar";
pub const POM_PATH: &str = "org/example/demo/1.0/demo-1.0.pom";
pub const JAR_BYTES: &[u8] = b"PK\x03\x04 pretend this is a jar";
pub const POM_BYTES: &[u8] = b"<project><artifactId>demo</artifactId></project>";

/// Sidecar body in the `<hex>  <filename>` form some repositories publish.
pub fn sidecar_body(kind: ChecksumKind, bytes: &[u8], file_name: &str) -> String {
    format!("{}  {file_name}\n", kind.digest_hex(bytes))
}

/// Mounts `bytes` at `<prefix>/<relative>` expecting `expected_hits` requests
/// when `Some`.
pub async fn mount_file(
    server: &MockServer,
    prefix: &str,
    relative: &str,
    bytes: Vec<u8>,
    expected_hits: Option<u64>,
) {
    let mock = Mock::given(method("GET"))
        .and(path(format!("{prefix}/{relative}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes));
    let mock = match expected_hits {
        Some(hits) => mock.expect(hits),
        None => mock,
    };
    mock.mount(server).await;
}

/// Mounts the demo jar and pom with md5 and sha1 sidecars under `prefix`.
pub async fn mount_demo_artifact(server: &MockServer, prefix: &str, expected_hits: Option<u64>) {
    for (relative, bytes, name) in [
        (JAR_PATH, JAR_BYTES, "demo-1.0.jar"),
        (POM_PATH, POM_BYTES, "demo-1.0.pom"),
    ] {
        mount_file(server, prefix, relative, bytes.to_vec(), expected_hits).await;
        for kind in [ChecksumKind::Md5, ChecksumKind::Sha1] {
            mount_file(
                server,
                prefix,
                &kind.sidecar_path(relative),
                sidecar_body(kind, bytes, name).into_bytes(),
                expected_hits,
            )
            .await;
        }
    }
}
