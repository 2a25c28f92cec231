use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

/// What a policy run inspects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// A registry reference such as `quay.io/org/app:1.0`.
    Image(String),
    /// A directory that already holds the image root filesystem.
    Local(Utf8PathBuf),
}

impl Target {
    /// The string recorded as `tested_image` and handed to the sandbox.
    pub fn display_name(&self) -> String {
        match self {
            Target::Image(reference) => reference.clone(),
            Target::Local(path) => path.to_string(),
        }
    }

    pub fn local_root(&self) -> Option<&Utf8Path> {
        match self {
            Target::Local(path) => Some(path),
            Target::Image(_) => None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Target::Local(_))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Image(reference) => write!(f, "image {reference}"),
            Target::Local(path) => write!(f, "local {path}"),
        }
    }
}
