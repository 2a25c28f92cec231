//! Tarball extraction and docker-archive layer flattening.

use crate::error::{ImageError, TarballError};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fs::{self, File};
use std::io;

const TAR_SUFFIX: &str = ".tar";
const OPAQUE_WHITEOUT: &str = ".wh..wh..opq";
const WHITEOUT_PREFIX: &str = ".wh.";

/// Name of the directory a saved image's layers are flattened into.
pub const ROOTFS_DIR: &str = "rootfs";

/// Directory a tarball extracts into: its own path with the `.tar` marker removed.
///
/// The file name must contain `.tar` exactly once; `abcdef0123.tar` maps to `abcdef0123`.
pub fn extraction_dir(tar_path: &Utf8Path) -> Result<Utf8PathBuf, TarballError> {
    let name = tar_path.file_name().ok_or(TarballError::MissingName)?;
    let occurrences = name.matches(TAR_SUFFIX).count();
    if occurrences != 1 {
        return Err(TarballError::Name(occurrences));
    }
    let stem = name.replacen(TAR_SUFFIX, "", 1);
    if matches!(stem.as_str(), "" | "." | "..") {
        return Err(TarballError::MissingName);
    }
    Ok(tar_path.with_file_name(stem))
}

/// Extract `tar_path` next to itself and return the extraction directory.
///
/// Name validation happens before anything touches the filesystem. A failure while
/// unpacking removes the partially written directory, unless it existed beforehand.
pub fn extract_tar(tar_path: &Utf8Path) -> Result<Utf8PathBuf, ImageError> {
    let wrap = |source: TarballError| ImageError::ExtractingTarball {
        path: tar_path.to_owned(),
        source,
    };

    let dir = extraction_dir(tar_path).map_err(wrap)?;
    let file = File::open(tar_path).map_err(|e| wrap(e.into()))?;

    let created = !dir.exists();
    fs::create_dir_all(&dir).map_err(|e| wrap(e.into()))?;
    let mut archive = tar::Archive::new(file);
    if let Err(err) = archive.unpack(&dir) {
        if created {
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                tracing::warn!(dir = %dir, error = %cleanup, "failed to remove partial extraction");
            }
        }
        return Err(wrap(err.into()));
    }

    tracing::debug!(tarball = %tar_path, dir = %dir, "extracted tarball");
    Ok(dir)
}

#[derive(Debug, Deserialize)]
struct ArchiveManifestEntry {
    #[serde(rename = "Layers", default)]
    layers: Vec<String>,
}

/// Apply the layers of an extracted docker-archive, in order, onto `<extracted>/rootfs`.
///
/// Archives without a `manifest.json` are treated as a plain root filesystem and
/// `extracted` itself is returned.
pub fn flatten_layers(extracted: &Utf8Path) -> Result<Utf8PathBuf, TarballError> {
    let manifest_path = extracted.join("manifest.json");
    if !manifest_path.exists() {
        return Ok(extracted.to_owned());
    }

    let text = fs::read_to_string(&manifest_path)?;
    let entries: Vec<ArchiveManifestEntry> =
        serde_json::from_str(&text).map_err(|e| TarballError::Manifest(e.to_string()))?;
    let entry = entries
        .into_iter()
        .next()
        .ok_or_else(|| TarballError::Manifest("manifest lists no images".to_string()))?;

    let rootfs = extracted.join(ROOTFS_DIR);
    fs::create_dir_all(&rootfs)?;

    for layer in &entry.layers {
        let layer_path = Utf8Path::new(layer);
        if !is_contained(layer_path) {
            return Err(TarballError::Manifest(format!(
                "layer path escapes archive: {layer}"
            )));
        }
        apply_layer(&extracted.join(layer_path), &rootfs)?;
    }

    Ok(rootfs)
}

fn apply_layer(layer: &Utf8Path, rootfs: &Utf8Path) -> Result<(), TarballError> {
    let mut archive = tar::Archive::new(File::open(layer)?);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let Some(path) = Utf8Path::from_path(&path) else {
            entry.unpack_in(rootfs)?;
            continue;
        };

        let name = path.file_name().unwrap_or_default();
        let parent = path.parent().unwrap_or(Utf8Path::new(""));

        if name == OPAQUE_WHITEOUT {
            if let Some(dir) = whiteout_dir(rootfs, parent)? {
                clear_dir(&dir)?;
            }
            continue;
        }
        if let Some(hidden) = name.strip_prefix(WHITEOUT_PREFIX) {
            if matches!(hidden, "" | "." | "..") {
                continue;
            }
            if let Some(dir) = whiteout_dir(rootfs, parent)? {
                remove_path(&dir.join(hidden))?;
            }
            continue;
        }

        entry.unpack_in(rootfs)?;
    }
    Ok(())
}

fn is_contained(path: &Utf8Path) -> bool {
    path.components()
        .all(|c| matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir))
}

/// The real directory under `rootfs` a whiteout in `parent` applies to.
///
/// Every component is inspected without following links. `None` when the directory
/// is missing, or when any component is a symlink or not a directory: removing
/// through a link could reach outside the root filesystem.
fn whiteout_dir(rootfs: &Utf8Path, parent: &Utf8Path) -> io::Result<Option<Utf8PathBuf>> {
    if !is_contained(parent) {
        return Ok(None);
    }
    let mut dir = rootfs.to_owned();
    for component in parent.components() {
        let Utf8Component::Normal(part) = component else {
            continue;
        };
        dir.push(part);
        let meta = match fs::symlink_metadata(&dir) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        if meta.file_type().is_symlink() {
            tracing::warn!(path = %dir, "ignoring whiteout below a symlink");
            return Ok(None);
        }
        if !meta.is_dir() {
            return Ok(None);
        }
    }
    Ok(Some(dir))
}

fn clear_dir(dir: &Utf8Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Remove `path` itself; a symlink is unlinked, never followed.
fn remove_path(path: &Utf8Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
