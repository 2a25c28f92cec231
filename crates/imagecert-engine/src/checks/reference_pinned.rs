use crate::check::{Check, CheckError, Requirement};
use crate::target::Target;
use imagecert_types::{HelpText, Level, Metadata, ids};

const FLOATING_TAG: &str = "latest";

pub struct ReferenceIsPinned;

impl Check for ReferenceIsPinned {
    fn name(&self) -> &'static str {
        ids::CHECK_REFERENCE_IS_PINNED
    }

    fn requirement(&self) -> Requirement {
        Requirement::Reference
    }

    fn validate(&self, target: &Target) -> Result<bool, CheckError> {
        match target {
            Target::Image(reference) if reference.trim().is_empty() => {
                Err(CheckError::Invalid("image reference is empty".to_string()))
            }
            Target::Image(reference) => Ok(is_pinned(reference)),
            Target::Local(path) => Err(CheckError::Invalid(format!(
                "a local filesystem ({path}) carries no image reference"
            ))),
        }
    }

    fn metadata(&self) -> Metadata {
        Metadata::new(
            "Checking that the image reference names a digest or an explicit tag",
            Level::Good,
        )
    }

    fn help(&self) -> HelpText {
        HelpText::new(
            "The image reference is untagged or uses the floating `latest` tag.",
            "Reference the image by digest (`name@sha256:...`) or by a versioned tag.",
        )
    }
}

/// A reference is pinned by a well-formed digest, or by a tag other than `latest`.
///
/// Only the last path segment is searched for a tag so registry ports
/// (`host:5000/app`) are not mistaken for one.
pub fn is_pinned(reference: &str) -> bool {
    if let Some((_, digest)) = reference.split_once('@') {
        return matches!(
            digest.split_once(':'),
            Some((algo, hex)) if !algo.is_empty() && !hex.is_empty()
        );
    }

    let last = reference.rsplit('/').next().unwrap_or(reference);
    match last.split_once(':') {
        Some((_, tag)) => !tag.is_empty() && tag != FLOATING_TAG,
        None => false,
    }
}
