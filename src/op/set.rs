//! Edit Manifest Values
//!
//! The `set` operation changes a single value in a manifest file, e.g. to
//! bump the version or add a requirement. The file is edited in place: all
//! other lines, including comments and commented-out options, are retained
//! verbatim.

use crate::ini;

/// Set Errors
///
/// This is the exhaustive list of possible errors raised by the set
/// operation. See each error for details.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the file at the specified path failed with the given error.
    #[error("cannot read {0:?}: {1}")]
    FileRead(std::ffi::OsString, std::io::Error),
    /// The file is not a valid document, or the edit would break it.
    #[error(transparent)]
    Document(#[from] ini::Error),
    /// Updating the file at the specified path failed with the given error.
    #[error("cannot update {0:?}: {1}")]
    FileUpdate(std::ffi::OsString, std::io::Error),
}

/// Set value
///
/// Set `key` in `section` to `value` in the manifest at `path`. Missing keys
/// and sections are appended. Returns whether the file content changed.
pub fn set(
    path: &std::path::Path,
    section: &str,
    key: &str,
    value: &str,
) -> Result<bool, Error> {
    let content = std::fs::read_to_string(path).map_err(
        |v| Error::FileRead(path.as_os_str().to_os_string(), v),
    )?;

    let mut document = ini::Document::parse(&content)?;
    document.set(section, key, value)?;

    let changed = super::file::update_file(path, &document.to_string()).map_err(
        |v| Error::FileUpdate(path.as_os_str().to_os_string(), v),
    )?;

    tracing::info!(path = %path.display(), section, key, changed, "updated manifest value");

    Ok(changed)
}
