//! The runtime hosting contract.
//!
//! [`RuntimeHost`] mirrors the runtime's native host control interface one
//! call per method. [`clr`] binds it to the real COM-style vtable exported by
//! the runtime library; tests substitute recording fakes.

use std::fmt;

pub mod clr;

pub use clr::{ClrBackend, ClrRuntimeHost};

/// A hosting-interface status code. Negative values are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HResult(pub i32);

impl HResult {
	pub const S_OK: Self = Self(0);
	pub const E_FAIL: Self = Self(0x8000_4005_u32 as i32);
	pub const E_POINTER: Self = Self(0x8000_4003_u32 as i32);

	pub fn is_failure(self) -> bool {
		self.0 < 0
	}

	/// `Ok` for success codes, `Err(self)` for failures.
	pub fn ok(self) -> Result<(), Self> {
		if self.is_failure() { Err(self) } else { Ok(()) }
	}
}

impl fmt::Display for HResult {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:#010x}", self.0 as u32)
	}
}

/// Hosting calls, named as the runtime names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostStage {
	Acquire,
	SetStartupFlags,
	Start,
	CreateAppDomain,
	ExecuteAssembly,
	UnloadAppDomain,
	Stop,
}

impl fmt::Display for HostStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Acquire => "GetCLRRuntimeHost",
			Self::SetStartupFlags => "SetStartupFlags",
			Self::Start => "Start",
			Self::CreateAppDomain => "CreateAppDomainWithManager",
			Self::ExecuteAssembly => "ExecuteAssembly",
			Self::UnloadAppDomain => "UnloadAppDomain",
			Self::Stop => "Stop",
		})
	}
}

/// Identifier of an app domain created by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomainId(pub u32);

bitflags::bitflags! {
	/// Runtime startup configuration, applied once before `Start`.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct StartupFlags: u32 {
		const CONCURRENT_GC = 0x1;
		const LOADER_OPTIMIZATION_SINGLE_DOMAIN = 0x2;
		const LOADER_OPTIMIZATION_MULTI_DOMAIN = 0x4;
		const LOADER_SAFEMODE = 0x10;
		const LOADER_SETPREFERENCE = 0x100;
		const SERVER_GC = 0x1000;
		const HOARD_GC_VM = 0x2000;
		const SINGLE_VERSION_HOSTING_INTERFACE = 0x4000;
		const LEGACY_IMPERSONATION = 0x1_0000;
		const DISABLE_COMMITTHREADSTACK = 0x2_0000;
		const ALWAYSFLOW_IMPERSONATION = 0x4_0000;
		const TRIM_GC_COMMIT = 0x8_0000;
		const ETW = 0x10_0000;
		const ARM = 0x40_0000;
		const SINGLE_APPDOMAIN = 0x80_0000;
		const APPX_APP_MODEL = 0x100_0000;
		const DISABLE_RANDOMIZED_STRING_HASHING = 0x200_0000;
	}
}

impl StartupFlags {
	/// Flags before environment overrides.
	pub const BASELINE: Self = Self::LOADER_OPTIMIZATION_SINGLE_DOMAIN
		.union(Self::SINGLE_APPDOMAIN)
		.union(Self::CONCURRENT_GC);

	/// Overlays boolean toggles from `lookup` onto [`Self::BASELINE`].
	///
	/// A toggle that is present sets or clears its bit; an absent one leaves
	/// the baseline alone.
	pub fn from_environment(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let mut flags = Self::BASELINE;
		for (flag, var) in [
			(Self::SERVER_GC, crate::config::SERVER_GC_VAR),
			(Self::CONCURRENT_GC, crate::config::CONCURRENT_GC_VAR),
		] {
			if let Some(value) = lookup(var) {
				flags.set(flag, clrboot_pal::env::parse_bool(&value));
			}
		}
		flags
	}
}

bitflags::bitflags! {
	/// App-domain creation flags.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct AppDomainFlags: u32 {
		const SECURITY_SANDBOXED = 0x1;
		const FORBID_CROSSAD_REVERSE_PINVOKE = 0x2;
		const IGNORE_UNHANDLED_EXCEPTIONS = 0x4;
		const FORCE_TRIVIAL_WAIT_OPERATIONS = 0x8;
		const ENABLE_PINVOKE_AND_CLASSIC_COMINTEROP = 0x10;
		const ENABLE_PLATFORM_SPECIFIC_APPS = 0x40;
		const ENABLE_ASSEMBLY_LOADFILE = 0x80;
		const DISABLE_TRANSPARENCY_ENFORCEMENT = 0x100;
	}
}

impl AppDomainFlags {
	/// Full-trust domain that may run platform-specific assemblies and call
	/// native code.
	pub const DEFAULT: Self = Self::ENABLE_PLATFORM_SPECIFIC_APPS
		.union(Self::ENABLE_PINVOKE_AND_CLASSIC_COMINTEROP)
		.union(Self::DISABLE_TRANSPARENCY_ENFORCEMENT);
}

/// App-domain property keys, in the order the host receives them.
pub const PROPERTY_KEYS: [&str; 5] = [
	"TRUSTED_PLATFORM_ASSEMBLIES",
	"APP_PATHS",
	"APP_NI_PATHS",
	"NATIVE_DLL_SEARCH_DIRECTORIES",
	"APP_LOCAL_WINMETADATA",
];

/// Native host control interface of a loaded runtime.
///
/// Calls must follow the lifecycle order: flags, start, create domain,
/// execute, unload domain, stop, release.
pub trait RuntimeHost {
	fn set_startup_flags(&mut self, flags: StartupFlags) -> Result<(), HResult>;

	fn start(&mut self) -> Result<(), HResult>;

	/// Creates an app domain. `manager` names an app-domain manager as
	/// `(assembly, type)`; `properties` are passed in order.
	fn create_app_domain_with_manager(
		&mut self,
		friendly_name: &str,
		flags: AppDomainFlags,
		manager: Option<(&str, &str)>,
		properties: &[(&str, &str)],
	) -> Result<DomainId, HResult>;

	/// Runs the assembly's entry point and returns its exit code. Blocks until
	/// managed code returns.
	fn execute_assembly(&mut self, domain: DomainId, assembly_path: &str, args: &[String]) -> Result<u32, HResult>;

	fn unload_app_domain(&mut self, domain: DomainId, wait: bool) -> Result<(), HResult>;

	fn stop(&mut self) -> Result<(), HResult>;

	/// Drops this process's reference to the interface.
	fn release(self)
	where
		Self: Sized;
}
