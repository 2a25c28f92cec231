use super::utils::{in_root, is_file, local_root};
use crate::check::{Check, CheckError, Requirement};
use crate::target::Target;
use imagecert_types::{HelpText, Level, Metadata, ids};

const OS_RELEASE_PATHS: [&str; 2] = ["/etc/os-release", "/usr/lib/os-release"];

pub struct HasOsRelease;

impl Check for HasOsRelease {
    fn name(&self) -> &'static str {
        ids::CHECK_HAS_OS_RELEASE
    }

    fn requirement(&self) -> Requirement {
        Requirement::Mount
    }

    fn validate(&self, target: &Target) -> Result<bool, CheckError> {
        let root = local_root(self.name(), target)?;
        for path in OS_RELEASE_PATHS {
            if is_file(&in_root(root, path))? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn metadata(&self) -> Metadata {
        Metadata::new(
            "Checking that the image identifies its operating system via os-release",
            Level::Good,
        )
    }

    fn help(&self) -> HelpText {
        HelpText::new(
            "Neither /etc/os-release nor /usr/lib/os-release exists in the image.",
            "Build from a base image that ships os-release metadata.",
        )
    }
}
