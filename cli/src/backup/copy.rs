//! File placement primitives shared by backup and restore.
//!
//! Content is always staged in a sibling temp path and renamed into place,
//! so a reader never observes a half-written file.
use std::fs::{self, File, Metadata};
use std::io;
use std::path::{Path, PathBuf};

/// Sibling temp path for `dst`.
fn staging_path(dst: &Path) -> PathBuf {
    let name = dst
        .file_name()
        .map_or_else(|| "file".into(), |n| n.to_string_lossy().into_owned());
    dst.with_file_name(format!(".{name}.myconfig-tmp"))
}

fn ensure_parent(dst: &Path) -> io::Result<()> {
    match dst.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Copy a regular file's content to `dst` via a temp sibling and rename.
/// Returns the number of bytes copied.
///
/// # Errors
///
/// Returns the underlying I/O error; the temp file is removed on failure.
pub fn copy_file_atomic(src: &Path, dst: &Path) -> io::Result<u64> {
    ensure_parent(dst)?;
    let tmp = staging_path(dst);
    let bytes = match fs::copy(src, &tmp) {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
    };
    if let Err(e) = fs::rename(&tmp, dst) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(bytes)
}

/// Write `bytes` to `dst` via a temp sibling and rename. Returns the
/// number of bytes written.
///
/// # Errors
///
/// Returns the underlying I/O error; the temp file is removed on failure.
pub fn write_file_atomic(dst: &Path, bytes: &[u8]) -> io::Result<u64> {
    ensure_parent(dst)?;
    let tmp = staging_path(dst);
    if let Err(e) = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, dst)) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(bytes.len() as u64)
}

/// Apply `meta`'s permission bits and modification time to `dst`.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn apply_metadata(meta: &Metadata, dst: &Path) -> io::Result<()> {
    let modified = meta.modified()?;
    match open_for_times(dst) {
        Ok(file) => file.set_modified(modified)?,
        // Read-only file on a platform that needs write access for times.
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {}
        Err(e) => return Err(e),
    }
    fs::set_permissions(dst, meta.permissions())
}

#[cfg(unix)]
fn open_for_times(path: &Path) -> io::Result<File> {
    File::open(path)
}

#[cfg(not(unix))]
fn open_for_times(path: &Path) -> io::Result<File> {
    File::options().write(true).open(path)
}

/// Apply only permission bits (used for directories).
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn apply_permissions(meta: &Metadata, dst: &Path) -> io::Result<()> {
    fs::set_permissions(dst, meta.permissions())
}

/// Create a symlink at `link` pointing to `target`, replacing whatever is
/// at `link` atomically. The target is recorded as-is, never resolved.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn place_symlink(target: &Path, link: &Path) -> io::Result<()> {
    ensure_parent(link)?;
    let tmp = staging_path(link);
    if tmp.symlink_metadata().is_ok() {
        fs::remove_file(&tmp)?;
    }
    create_symlink(target, &tmp)?;
    if let Err(e) = fs::rename(&tmp, link) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    let resolved = link.parent().map_or_else(|| target.to_path_buf(), |p| p.join(target));
    if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}
