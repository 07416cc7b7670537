//! Domain models for release recording.
//!
//! - `BuildRecord` / `BuildHistory`: the host's build history
//! - `PackageConfiguration` / `PackageSelectionSet`: packages pinned in a release
//! - `RecorderError`: error taxonomy

pub mod build;
pub mod error;
pub mod package;

pub use build::{BuildChain, BuildHistory, BuildId, BuildRecord, BuildResult, Commit};
pub use error::{ErrorKind, RecorderError, Result};
pub use package::{PackageConfiguration, PackageSelection, PackageSelectionSet};
