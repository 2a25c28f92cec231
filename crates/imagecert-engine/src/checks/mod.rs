mod bundle;
mod has_license;
mod os_release;
mod reference_pinned;
mod utils;


pub use bundle::{BundleHasAnnotations, BundleHasManifests};
pub use has_license::HasLicense;
pub use os_release::HasOsRelease;
pub use reference_pinned::{ReferenceIsPinned, is_pinned};
