use crate::check::CheckError;
use crate::target::Target;
use camino::{Utf8Path, Utf8PathBuf};
use std::io::ErrorKind;

pub fn local_root<'a>(check: &'static str, target: &'a Target) -> Result<&'a Utf8Path, CheckError> {
    match target {
        Target::Local(root) => Ok(root),
        Target::Image(reference) => Err(CheckError::NeedsFilesystem {
            check,
            reference: reference.clone(),
        }),
    }
}

/// Join an image-absolute path like `/etc/os-release` onto `root`.
pub fn in_root(root: &Utf8Path, image_path: &str) -> Utf8PathBuf {
    root.join(image_path.trim_start_matches('/'))
}

/// Regular files directly under `dir`. A missing directory yields `None`.
pub fn list_files(dir: &Utf8Path) -> Result<Option<Vec<String>>, CheckError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            return Ok(None);
        }
        Err(err) => return Err(CheckError::io(dir, err)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CheckError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| CheckError::io(dir, e))?;
        if file_type.is_file() {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    files.sort();
    Ok(Some(files))
}

/// `Ok(false)` for a missing file; other I/O errors propagate.
pub fn is_file(path: &Utf8Path) -> Result<bool, CheckError> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            Ok(false)
        }
        Err(err) => Err(CheckError::io(path, err)),
    }
}

/// File contents, or `None` when missing.
pub fn read_optional(path: &Utf8Path) -> Result<Option<String>, CheckError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            Ok(None)
        }
        Err(err) => Err(CheckError::io(path, err)),
    }
}
