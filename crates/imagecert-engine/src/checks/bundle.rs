//! Operator-bundle layout checks.

use super::utils::{in_root, list_files, local_root, read_optional};
use crate::check::{Check, CheckError, Requirement};
use crate::target::Target;
use imagecert_types::{HelpText, Level, Metadata, ids};

const MANIFESTS_DIR: &str = "/manifests";
const ANNOTATIONS_FILE: &str = "/metadata/annotations.yaml";
const PACKAGE_ANNOTATION: &str = "operators.operatorframework.io.bundle.package.v1";

pub struct BundleHasManifests;

impl Check for BundleHasManifests {
    fn name(&self) -> &'static str {
        ids::CHECK_BUNDLE_HAS_MANIFESTS
    }

    fn requirement(&self) -> Requirement {
        Requirement::Filesystem
    }

    fn validate(&self, target: &Target) -> Result<bool, CheckError> {
        let root = local_root(self.name(), target)?;
        let files = list_files(&in_root(root, MANIFESTS_DIR))?.unwrap_or_default();
        Ok(files
            .iter()
            .any(|f| f.ends_with(".yaml") || f.ends_with(".yml")))
    }

    fn metadata(&self) -> Metadata {
        Metadata::new(
            "Checking that the bundle ships at least one manifest under /manifests",
            Level::Best,
        )
    }

    fn help(&self) -> HelpText {
        HelpText::new(
            "No YAML manifests were found in /manifests.",
            "Place the ClusterServiceVersion and CRD manifests in the bundle's /manifests directory.",
        )
    }
}

pub struct BundleHasAnnotations;

impl Check for BundleHasAnnotations {
    fn name(&self) -> &'static str {
        ids::CHECK_BUNDLE_HAS_ANNOTATIONS
    }

    fn requirement(&self) -> Requirement {
        Requirement::Filesystem
    }

    fn validate(&self, target: &Target) -> Result<bool, CheckError> {
        let root = local_root(self.name(), target)?;
        let Some(text) = read_optional(&in_root(root, ANNOTATIONS_FILE))? else {
            return Ok(false);
        };
        Ok(declares_package(&text))
    }

    fn metadata(&self) -> Metadata {
        Metadata::new(
            "Checking that bundle annotations declare the operator package",
            Level::Best,
        )
    }

    fn help(&self) -> HelpText {
        HelpText::new(
            "metadata/annotations.yaml is missing or does not declare the package annotation.",
            format!("Add `{PACKAGE_ANNOTATION}: <package-name>` to metadata/annotations.yaml."),
        )
    }
}

/// A non-comment line that sets the package annotation to a non-empty value.
fn declares_package(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .any(|(key, value)| {
            key.trim().trim_matches(|c| c == '"' || c == '\'') == PACKAGE_ANNOTATION
                && !value.trim().is_empty()
        })
}
