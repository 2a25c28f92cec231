//! Stable identifiers for checks, policies, and the sandbox protocol.
//!
//! Check names are CamelCase and double as the public identifier in results.
//! Environment variable names are part of the parent/worker contract and must not change.

// Checks
pub const CHECK_HAS_LICENSE: &str = "HasLicense";
pub const CHECK_HAS_OS_RELEASE: &str = "HasOsRelease";
pub const CHECK_REFERENCE_IS_PINNED: &str = "ReferenceIsPinned";
pub const CHECK_BUNDLE_HAS_MANIFESTS: &str = "BundleHasManifests";
pub const CHECK_BUNDLE_HAS_ANNOTATIONS: &str = "BundleHasAnnotations";

// Policies
pub const POLICY_CONTAINER: &str = "container";
pub const POLICY_OPERATOR: &str = "operator";

// Sandbox protocol: environment variables set by the parent for the worker.
pub const ENV_IN_SANDBOX: &str = "IMAGECERT_IN_SANDBOX";
pub const ENV_CHECK_NAME: &str = "IMAGECERT_CHECK_NAME";
pub const ENV_IMAGE: &str = "IMAGECERT_IMAGE";
pub const ENV_MOUNTED: &str = "IMAGECERT_MOUNTED";
pub const ENV_LOG_FILE: &str = "IMAGECERT_LOG_FILE";
pub const ENV_LOG_LEVEL: &str = "IMAGECERT_LOG_LEVEL";
pub const ENV_PATH: &str = "PATH";
/// Resolved container-engine binary, so the worker uses the same one as its parent.
pub const ENV_CONTAINER_ENGINE: &str = "IMAGECERT_CONTAINER_ENGINE";

/// Value of [`ENV_IN_SANDBOX`] meaning "already inside the namespace".
pub const IN_SANDBOX_SENTINEL: &str = "1";

/// Value of [`ENV_MOUNTED`] meaning "the image reference is a local path".
/// Anything else reads as false.
pub const MOUNTED_TRUE: &str = "true";

/// Marker the worker writes on stderr before exiting on an unrecoverable error.
/// Matched case-insensitively by the parent.
pub const FATAL_MARKER: &str = "level=fatal";

// Worker entrypoint: `<self> check run`.
pub const WORKER_ARGS: [&str; 2] = ["check", "run"];
