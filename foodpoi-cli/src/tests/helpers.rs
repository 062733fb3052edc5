//! Fixtures shared by the CLI tests.

use camino::Utf8PathBuf;
use rstest::fixture;
use std::fs;
use tempfile::TempDir;

#[fixture]
pub(super) fn workspace() -> TempDir {
    TempDir::new().expect("tempdir")
}

pub(super) fn utf8_path(dir: &TempDir, name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("utf-8 temp path")
}

#[cfg(feature = "store-sqlite")]
/// Write a small Karlsruhe export with one malformed line.
pub(super) fn write_export(dir: &TempDir) -> Utf8PathBuf {
    let path = utf8_path(dir, "pois.csv");
    fs::write(
        &path,
        concat!(
            "category|id|lat|lon|name\n",
            "3|cafe-roma|49.0100|8.4040|Cafe Roma\n",
            "1|zum-loewen|49.0140|8.4045|Zum Löwen\n",
            "not|a|valid|line\n",
            "2|schlossgarten|49.0160|8.4050|Schlossgarten Kiosk\n",
            "\n",
            "1|durlach-grill|48.9990|8.4700|Durlach Grill\n",
        ),
    )
    .expect("write export");
    path
}

#[cfg(feature = "store-sqlite")]
pub(super) fn parse_json(output: &[u8]) -> serde_json::Value {
    assert!(output.ends_with(b"\n"), "output should end with a newline");
    serde_json::from_slice(output).expect("valid JSON output")
}
