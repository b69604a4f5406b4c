//! Path helpers for fingerprinting and storage.
//!
//! Paths are stored as opaque byte sequences in the platform's native
//! representation. No text encoding is assumed:
//!
//! - Unix: the raw `OsStr` bytes
//! - Windows: UTF-16 code units, little endian
//!
//! # Example
//!
//! ```
//! use findex::scanner::path_utils::{path_from_bytes, path_to_bytes};
//! use std::path::Path;
//!
//! let path = Path::new("/tmp/report.txt");
//! let bytes = path_to_bytes(path);
//! assert_eq!(path_from_bytes(&bytes), path);
//! ```

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use directories::BaseDirs;

/// Expand a leading `~` component to the current user's home directory.
///
/// `~user` forms are left untouched, as is any path when the home
/// directory cannot be determined.
#[must_use]
pub fn expand_user(path: &Path) -> Cow<'_, Path> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match BaseDirs::new() {
            Some(dirs) => Cow::Owned(dirs.home_dir().join(components.as_path())),
            None => {
                log::debug!("Home directory unknown, not expanding {}", path.display());
                Cow::Borrowed(path)
            }
        },
        _ => Cow::Borrowed(path),
    }
}

/// Encode a path as its native byte representation.
#[cfg(unix)]
#[must_use]
pub fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

/// Decode a path from its native byte representation.
#[cfg(unix)]
#[must_use]
pub fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

/// Encode a path as its native byte representation.
#[cfg(windows)]
#[must_use]
pub fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::windows::ffi::OsStrExt;
    Cow::Owned(
        path.as_os_str()
            .encode_wide()
            .flat_map(u16::to_le_bytes)
            .collect(),
    )
}

/// Decode a path from its native byte representation.
#[cfg(windows)]
#[must_use]
pub fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;
    let wide: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    PathBuf::from(OsString::from_wide(&wide))
}

/// Encode a path as its native byte representation.
#[cfg(not(any(unix, windows)))]
#[must_use]
pub fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
    Cow::Borrowed(path.as_os_str().as_encoded_bytes())
}

/// Decode a path from its native byte representation.
#[cfg(not(any(unix, windows)))]
#[must_use]
pub fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}
