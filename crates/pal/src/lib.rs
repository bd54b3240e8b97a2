//! Platform abstraction layer.
//!
//! Cross-platform primitives the bootstrapper is built from:
//!
//! * [`path`]: string path algebra (combine, normalize, components)
//! * [`fs`]: existence probes, single-level enumeration, absolute paths
//! * [`env`]: environment lookup, boolean toggles, reference expansion
//! * [`library`]: dynamic library loading with optional pinning
//! * [`activation`]: activation context scoped to one call
//! * [`sys`]: the per-OS capability trait behind all of the above
//!
//! Nothing here knows what a runtime is. Failures are plain [`PalError`]
//! values; existence probes return `bool`.

pub mod activation;
pub mod env;
pub mod error;
pub mod fs;
pub mod library;
pub mod path;
pub mod sys;

pub use activation::ActivationContext;
pub use error::{PalError, Result};
pub use fs::EntryKind;
pub use library::DynamicLibrary;
pub use path::PathStyle;
