//! Hosting a managed runtime from a native process.
//!
//! * [`version`]: semantic versions of installed runtimes
//! * [`locator`]: scanning an installed-runtimes root for candidates
//! * [`loader`]: loading and pinning a runtime library
//! * [`tpa`]: the trusted platform assembly list
//! * [`host`]: the runtime's host control interface and its flag sets
//! * [`bootstrap`]: the end-to-end sequence tying the above together
//!
//! Platform details live in `clrboot-pal`; this crate holds the runtime
//! semantics only.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod host;
pub mod loader;
pub mod locator;
pub mod tpa;
pub mod version;

pub use bootstrap::Bootstrapper;
pub use config::{BootstrapConfig, FAILURE_EXIT_CODE};
pub use error::{BootstrapError, LoadError};
pub use host::{AppDomainFlags, ClrBackend, DomainId, HResult, HostStage, RuntimeHost, StartupFlags};
pub use loader::{RuntimeBackend, RuntimeInstance};
pub use locator::RuntimeCandidate;
pub use tpa::AssemblyList;
pub use version::RuntimeVersion;
