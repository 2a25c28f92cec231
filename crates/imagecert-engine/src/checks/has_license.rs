use super::utils::{in_root, list_files, local_root};
use crate::check::{Check, CheckError, Requirement};
use crate::target::Target;
use imagecert_types::{HelpText, Level, Metadata, ids};

const LICENSES_DIR: &str = "/licenses";

pub struct HasLicense;

impl Check for HasLicense {
    fn name(&self) -> &'static str {
        ids::CHECK_HAS_LICENSE
    }

    fn requirement(&self) -> Requirement {
        Requirement::Filesystem
    }

    fn validate(&self, target: &Target) -> Result<bool, CheckError> {
        let root = local_root(self.name(), target)?;
        let files = list_files(&in_root(root, LICENSES_DIR))?.unwrap_or_default();
        tracing::debug!(check = self.name(), count = files.len(), "license files found");
        Ok(!files.is_empty())
    }

    fn metadata(&self) -> Metadata {
        Metadata::new(
            "Checking that the image ships its license terms under /licenses",
            Level::Best,
        )
    }

    fn help(&self) -> HelpText {
        HelpText::new(
            "No license files were found in /licenses.",
            "Create a /licenses directory in the image and copy the license terms of the \
             software it contains into it.",
        )
    }
}
