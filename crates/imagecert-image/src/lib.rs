//! Image resource management through an external container-engine CLI.
//!
//! Everything here shells out (pull, save, create, cp, rm, mount, image mount) except
//! tarball extraction, which happens in-process. Acquired resources are handed back as
//! guards so they are released on every exit path.

#![forbid(unsafe_code)]

mod command;
mod engine;
mod error;
mod lease;
pub mod tarball;

pub use engine::{ContainerEngine, CreateOptions, DEFAULT_ENGINE};
pub use error::{CommandError, ImageError, TarballError};
pub use lease::{AcquiredFilesystem, ContainerHandle, ImageMount};
pub use tarball::{extract_tar, extraction_dir};
