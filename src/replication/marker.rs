//! Upload markers: `<artifact>.uploaded` sentinel files
//!
//! A marker is written only after the remote store acknowledged the
//! artifact, and is the sole cross-restart record that it was replicated.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const MARKER_SUFFIX: &str = ".uploaded";

const MARKER_CONTENTS: &[u8] = b"uploaded\n";

pub fn marker_path(artifact: &Path) -> PathBuf {
    let mut name = OsString::from(artifact.as_os_str());
    name.push(MARKER_SUFFIX);
    PathBuf::from(name)
}

pub fn is_marked(artifact: &Path) -> bool {
    marker_path(artifact).is_file()
}

pub fn mark(artifact: &Path) -> io::Result<()> {
    fs::write(marker_path(artifact), MARKER_CONTENTS)
}
