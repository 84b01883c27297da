//! Blender path handling.
//! Paths are stored as bytes; `//` marks a path relative to the .blend file.

use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlendPath(Vec<u8>);

impl BlendPath {
    pub fn new<P: AsRef<[u8]>>(path: P) -> Self {
        let mut bytes = path.as_ref().to_vec();
        for b in &mut bytes {
            if *b == b'\\' {
                *b = b'/';
            }
        }
        BlendPath(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_blendfile_relative(&self) -> bool {
        self.0.starts_with(b"//")
    }

    pub fn is_absolute(&self) -> bool {
        if self.is_blendfile_relative() {
            return false;
        }
        if self.0.starts_with(b"/") {
            return true;
        }
        // Windows drive letter, `C:/` (backslashes are already normalised)
        self.0.len() >= 3
            && self.0[0].is_ascii_alphabetic()
            && self.0[1] == b':'
            && self.0[2] == b'/'
    }

    /// Resolve to a filesystem path.
    ///
    /// `//` paths are joined onto `blend_dir`; without one they are left relative,
    /// as are plain relative paths, so the filesystem resolves them against the
    /// working directory.
    pub fn resolve(&self, blend_dir: Option<&Path>) -> PathBuf {
        if self.is_absolute() {
            return PathBuf::from(self.to_string());
        }
        let rel = if self.is_blendfile_relative() {
            &self.0[2..]
        } else {
            &self.0[..]
        };
        let rel = PathBuf::from(String::from_utf8_lossy(rel).into_owned());
        match (self.is_blendfile_relative(), blend_dir) {
            (true, Some(dir)) => dir.join(rel),
            _ => rel,
        }
    }
}

impl fmt::Display for BlendPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for BlendPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlendPath({:?})", String::from_utf8_lossy(&self.0))
    }
}
