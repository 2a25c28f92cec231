use crate::command::{self, last_line};
use crate::error::{ImageError, TarballError};
use crate::lease::{AcquiredFilesystem, ContainerHandle, ImageMount};
use crate::tarball;
use camino::{Utf8Path, Utf8PathBuf};

/// Default container-engine binary.
pub const DEFAULT_ENGINE: &str = "podman";

/// Options for [`ContainerEngine::create`].
#[derive(Clone, Debug, Default)]
pub struct CreateOptions {
    pub name: Option<String>,
    pub entrypoint: Option<String>,
    /// Passed verbatim before the image reference.
    pub extra_args: Vec<String>,
}

impl CreateOptions {
    fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(name) = &self.name {
            args.push("--name".to_string());
            args.push(name.clone());
        }
        if let Some(entrypoint) = &self.entrypoint {
            args.push("--entrypoint".to_string());
            args.push(entrypoint.clone());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Handle to an external container-engine CLI (podman-compatible).
///
/// Every method is a blocking subprocess call. The type is cheap to clone; guards
/// hold their own copy so they can release resources on drop.
#[derive(Clone, Debug)]
pub struct ContainerEngine {
    binary: String,
    work_root: Option<Utf8PathBuf>,
}

impl Default for ContainerEngine {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE)
    }
}

impl ContainerEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            work_root: None,
        }
    }

    /// Create acquisition work directories under `root` instead of the system temp dir.
    pub fn with_work_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.work_root = Some(root.into());
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Fetch `reference` into the local cache and return the image ID the engine printed.
    pub fn pull(&self, reference: &str) -> Result<String, ImageError> {
        let out = command::run(&self.binary, ["pull", reference]).map_err(|source| {
            ImageError::PullFailed {
                reference: reference.to_string(),
                source,
            }
        })?;

        let id = last_line(&out.stdout).ok_or_else(|| ImageError::UnexpectedOutput {
            command: format!("{} pull {reference}", self.binary),
            reason: "no image id printed".to_string(),
        })?;
        if id.contains(['/', '\\']) || id.contains(char::is_whitespace) {
            return Err(ImageError::UnexpectedOutput {
                command: format!("{} pull {reference}", self.binary),
                reason: format!("not an image id: {id}"),
            });
        }
        Ok(id.to_string())
    }

    /// Serialize a cached image to a docker-archive tarball at `dest`.
    pub fn save(&self, reference: &str, dest: &Utf8Path) -> Result<(), ImageError> {
        command::run(
            &self.binary,
            [
                "save",
                "--format",
                "docker-archive",
                "-o",
                dest.as_str(),
                reference,
            ],
        )
        .map(|_| ())
        .map_err(|source| ImageError::SaveFailed {
            reference: reference.to_string(),
            dest: dest.to_owned(),
            source,
        })
    }

    /// Create a stopped container. The caller owns it and must [`remove`](Self::remove) it.
    pub fn create(&self, reference: &str, opts: &CreateOptions) -> Result<String, ImageError> {
        let mut args = vec!["create".to_string()];
        args.extend(opts.to_args());
        args.push(reference.to_string());

        let out = command::run(&self.binary, &args).map_err(|source| {
            ImageError::CreateFailed {
                reference: reference.to_string(),
                source,
            }
        })?;
        last_line(&out.stdout)
            .map(str::to_string)
            .ok_or_else(|| ImageError::UnexpectedOutput {
                command: format!("{} create {reference}", self.binary),
                reason: "no container id printed".to_string(),
            })
    }

    pub fn copy_from(&self, container: &str, src: &str, dst: &Utf8Path) -> Result<(), ImageError> {
        let from = format!("{container}:{src}");
        command::run(&self.binary, ["cp", from.as_str(), dst.as_str()])
            .map(|_| ())
            .map_err(|source| ImageError::CopyFailed {
                container: container.to_string(),
                src: src.to_string(),
                source,
            })
    }

    pub fn remove(&self, container: &str) -> Result<(), ImageError> {
        command::run(&self.binary, ["rm", container])
            .map(|_| ())
            .map_err(|source| ImageError::RemoveFailed {
                container: container.to_string(),
                source,
            })
    }

    /// Mount a container's filesystem and return the mountpoint.
    pub fn mount(&self, container: &str) -> Result<Utf8PathBuf, ImageError> {
        self.mount_with(&["mount", container], &["unmount", container], container)
    }

    pub fn unmount(&self, container: &str) -> Result<(), ImageError> {
        self.unmount_with(&["unmount", container], container)
    }

    /// Mount an image (not a container) and return the mountpoint.
    ///
    /// Rootless engines only allow this inside their user namespace.
    pub fn mount_image(&self, reference: &str) -> Result<Utf8PathBuf, ImageError> {
        self.mount_with(
            &["image", "mount", reference],
            &["image", "unmount", reference],
            reference,
        )
    }

    pub fn unmount_image(&self, reference: &str) -> Result<(), ImageError> {
        self.unmount_with(&["image", "unmount", reference], reference)
    }

    /// Run `args` and take the mountpoint from the last line of stdout. A mount that
    /// succeeds without printing one is undone with `undo` before reporting the error.
    fn mount_with(
        &self,
        args: &[&str],
        undo: &[&str],
        target: &str,
    ) -> Result<Utf8PathBuf, ImageError> {
        let out = command::run(&self.binary, args).map_err(|source| ImageError::MountFailed {
            target: target.to_string(),
            source,
        })?;
        if let Some(path) = last_line(&out.stdout) {
            return Ok(Utf8PathBuf::from(path));
        }

        if let Err(err) = self.unmount_with(undo, target) {
            tracing::warn!(target, error = %err, "failed to undo mount without a mountpoint");
        }
        Err(ImageError::UnexpectedOutput {
            command: format!("{} {}", self.binary, args.join(" ")),
            reason: "no mountpoint printed".to_string(),
        })
    }

    fn unmount_with(&self, args: &[&str], target: &str) -> Result<(), ImageError> {
        command::run(&self.binary, args)
            .map(|_| ())
            .map_err(|source| ImageError::UnmountFailed {
                target: target.to_string(),
                source,
            })
    }

    /// Pull, save, extract, and flatten `reference` into a private work directory.
    ///
    /// Steps run strictly in that order and the first failure stops the rest. The
    /// returned guard owns the tarball and the extracted tree; both go away when it drops,
    /// and so does everything written before a failure.
    pub fn acquire_filesystem(&self, reference: &str) -> Result<AcquiredFilesystem, ImageError> {
        let workdir = self.work_dir()?;
        let base = Utf8Path::from_path(workdir.path())
            .ok_or_else(|| {
                ImageError::WorkDir(std::io::Error::other("work directory is not valid UTF-8"))
            })?
            .to_owned();

        let image_id = self.pull(reference)?;
        let tarball = base.join(format!("{image_id}.tar"));
        self.save(reference, &tarball)?;
        let extracted = tarball::extract_tar(&tarball)?;
        let root = tarball::flatten_layers(&extracted).map_err(|source: TarballError| {
            ImageError::ExtractingTarball {
                path: tarball.clone(),
                source,
            }
        })?;

        tracing::info!(reference, image_id = %image_id, root = %root, "acquired image filesystem");
        Ok(AcquiredFilesystem::new(workdir, image_id, tarball, extracted, root))
    }

    /// [`mount_image`](Self::mount_image) with a guard that unmounts on drop.
    pub fn mount_image_scoped(&self, reference: &str) -> Result<ImageMount, ImageError> {
        let path = self.mount_image(reference)?;
        Ok(ImageMount::new(self.clone(), reference.to_string(), path))
    }

    /// [`create`](Self::create) with a guard that removes the container on drop.
    pub fn create_scoped(
        &self,
        reference: &str,
        opts: &CreateOptions,
    ) -> Result<ContainerHandle, ImageError> {
        let id = self.create(reference, opts)?;
        Ok(ContainerHandle::new(self.clone(), id))
    }

    /// Copy `src` out of `reference` into `dst` through a throwaway container.
    pub fn copy_out(&self, reference: &str, src: &str, dst: &Utf8Path) -> Result<(), ImageError> {
        let container = self.create_scoped(reference, &CreateOptions::default())?;
        self.copy_from(container.id(), src, dst)?;
        container.release();
        Ok(())
    }

    fn work_dir(&self) -> Result<tempfile::TempDir, ImageError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("imagecert-");
        match &self.work_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(ImageError::WorkDir)
    }
}
