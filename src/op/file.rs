//! File Helpers
//!
//! Shared file-system helpers of the operations that write manifests.

// Ensure directory exists
//
// Make sure the directory at the given path exists. Create the directory and
// its parent directories if necessary. An empty path refers to the working
// directory and is accepted as is.
pub(crate) fn ensure_dir(path: &std::path::Path) -> std::io::Result<()> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(path)
}

// Update a file if required
//
// This writes the given content to the specified file, but only if the file
// content does not already match the new content. This avoids modifying a file
// unless necessary. Thus, the file timestamp is only modified if the content
// really changed. Returns whether the file was modified.
//
// Note that this reads in the entire file content. Thus, use it only on
// trusted content.
pub(crate) fn update_file(
    path: &std::path::Path,
    content: &str,
) -> std::io::Result<bool> {
    // Open the file read+write and create it if it does not exist, yet.
    let mut f = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    // Read the entire file content into memory.
    let mut old = String::new();
    <std::fs::File as std::io::Read>::read_to_string(&mut f, &mut old)?;

    if old == content {
        return Ok(false);
    }

    // Rewind the position, truncate the file and write the new contents.
    <std::fs::File as std::io::Seek>::rewind(&mut f)?;
    f.set_len(0)?;
    <std::fs::File as std::io::Write>::write_all(&mut f, content.as_bytes())?;

    // Sync the file now to ensure errors are caught properly.
    f.sync_all()?;

    Ok(true)
}
