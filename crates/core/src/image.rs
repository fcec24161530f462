//! Image naming.
//!
//! Images are referred to by a base path without a container extension, the
//! same way the imaging tools accept them. This module strips extensions,
//! derives base names and checks whether a base path resolves to a file.

use crate::constants::{IMAGE_EXTENSIONS, NONE_SENTINEL};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Removes every trailing image-container extension from `path`.
///
/// Stripping repeats until no known extension remains, so applying it twice
/// gives the same result as applying it once.
pub fn strip_image_extension(path: &str) -> String {
    let mut stripped = path;
    while let Some(shorter) = IMAGE_EXTENSIONS
        .iter()
        .find_map(|ext| stripped.strip_suffix(ext))
    {
        if shorter.is_empty() || shorter.ends_with('/') {
            break;
        }
        stripped = shorter;
    }
    stripped.to_owned()
}

/// Final path component of `path` with its image extension removed.
///
/// `/a/b/c.nii.gz` gives `c`.
pub fn image_base_name(path: &str) -> String {
    let stripped = strip_image_extension(path);
    Path::new(&stripped)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Returns true when `value` means "not supplied" (empty or the `NONE` sentinel).
pub fn is_unset(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == NONE_SENTINEL
}

/// An image identified by its extension-free base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePath {
    base: PathBuf,
}

impl ImagePath {
    /// Builds an image reference from user input, dropping any container extension.
    ///
    /// Returns `None` for empty or `NONE` input.
    pub fn parse(raw: &str) -> Option<Self> {
        if is_unset(raw) {
            return None;
        }
        Some(Self {
            base: PathBuf::from(strip_image_extension(raw.trim())),
        })
    }

    /// Wraps a path that is already extension-free (working-directory artifacts).
    pub fn from_base(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// File name without directory or extension.
    pub fn base_name(&self) -> String {
        self.base
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn parent(&self) -> Option<&Path> {
        self.base.parent()
    }

    /// Finds the file this image refers to.
    ///
    /// The literal base path is accepted first, then base + each known
    /// extension. Returns `None` when nothing matches.
    pub fn resolve_existing(&self) -> Option<PathBuf> {
        if self.base.is_file() {
            return Some(self.base.clone());
        }
        IMAGE_EXTENSIONS
            .iter()
            .map(|ext| {
                let mut candidate = OsString::from(self.base.as_os_str());
                candidate.push(ext);
                PathBuf::from(candidate)
            })
            .find(|candidate| candidate.is_file())
    }

    pub fn exists(&self) -> bool {
        self.resolve_existing().is_some()
    }
}

impl AsRef<Path> for ImagePath {
    fn as_ref(&self) -> &Path {
        &self.base
    }
}

impl fmt::Display for ImagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base.display())
    }
}
