//! Scoped ownership of acquired image resources.
//!
//! Each guard releases its resource exactly once: explicitly through `release`, or on drop.
//! Release failures are logged and never returned, so they cannot mask a verdict that was
//! already computed.

use crate::engine::ContainerEngine;
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// A pulled, saved, and extracted image living in a private work directory.
#[derive(Debug)]
pub struct AcquiredFilesystem {
    workdir: TempDir,
    image_id: String,
    tarball: Utf8PathBuf,
    extracted: Utf8PathBuf,
    root: Utf8PathBuf,
}

impl AcquiredFilesystem {
    pub(crate) fn new(
        workdir: TempDir,
        image_id: String,
        tarball: Utf8PathBuf,
        extracted: Utf8PathBuf,
        root: Utf8PathBuf,
    ) -> Self {
        Self {
            workdir,
            image_id,
            tarball,
            extracted,
            root,
        }
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn tarball(&self) -> &Utf8Path {
        &self.tarball
    }

    pub fn extracted_dir(&self) -> &Utf8Path {
        &self.extracted
    }

    /// Root filesystem checks should look at.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Remove the tarball and extracted tree now.
    pub fn release(self) {
        let path = self.workdir.path().to_path_buf();
        if let Err(err) = self.workdir.close() {
            tracing::warn!(dir = %path.display(), error = %err, "failed to remove work directory");
        }
    }
}

/// A mounted image; unmounted when released or dropped.
#[derive(Debug)]
pub struct ImageMount {
    engine: ContainerEngine,
    reference: String,
    path: Utf8PathBuf,
    released: bool,
}

impl ImageMount {
    pub(crate) fn new(engine: ContainerEngine, reference: String, path: Utf8PathBuf) -> Self {
        Self {
            engine,
            reference,
            path,
            released: false,
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn release(mut self) {
        self.unmount();
    }

    fn unmount(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = self.engine.unmount_image(&self.reference) {
            tracing::warn!(reference = %self.reference, error = %err, "failed to unmount image");
        }
    }
}

impl Drop for ImageMount {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// A created container; removed when released or dropped.
#[derive(Debug)]
pub struct ContainerHandle {
    engine: ContainerEngine,
    id: String,
    released: bool,
}

impl ContainerHandle {
    pub(crate) fn new(engine: ContainerEngine, id: String) -> Self {
        Self {
            engine,
            id,
            released: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = self.engine.remove(&self.id) {
            tracing::warn!(container = %self.id, error = %err, "failed to remove container");
        }
    }
}

impl Drop for ContainerHandle {
    fn drop(&mut self) {
        self.remove();
    }
}
