//! The bootstrap sequence.
//!
//! [`Bootstrapper::run`] walks one linear path: validate the target, find and
//! load a runtime, configure and start its host, build the trusted assembly
//! list, create the app domain, execute, then unload, stop and release. Any
//! failure aborts the run. Nothing is rolled back; the process is expected to
//! exit with the runtime library still resident.

use clrboot_pal::{ActivationContext, PalError, env, fs, path};
use tracing::{debug, info, warn};

use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, LoadError};
use crate::host::{AppDomainFlags, HResult, HostStage, PROPERTY_KEYS, RuntimeHost, StartupFlags};
use crate::loader::{RuntimeBackend, RuntimeInstance, load_candidate, load_runtime};
use crate::locator::locate_runtimes;
use crate::tpa::AssemblyList;

/// Literal entry the runtime expects in its app search paths.
const NATIVE_IMAGE_PATH_ENTRY: &str = "NI";

type Lookup<'a> = Box<dyn Fn(&str) -> Option<String> + 'a>;

/// Drives one hosted run of a managed executable.
pub struct Bootstrapper<'a, B: RuntimeBackend> {
	backend: B,
	config: BootstrapConfig,
	lookup: Lookup<'a>,
}

impl<B: RuntimeBackend> Bootstrapper<'static, B> {
	/// Bootstrapper reading toggles and path references from the process
	/// environment.
	pub fn new(backend: B, config: BootstrapConfig) -> Self {
		Self::with_environment(backend, config, env::var)
	}
}

impl<'a, B: RuntimeBackend> Bootstrapper<'a, B> {
	/// Bootstrapper resolving environment variables through `lookup`.
	pub fn with_environment(
		backend: B,
		config: BootstrapConfig,
		lookup: impl Fn(&str) -> Option<String> + 'a,
	) -> Self {
		Self {
			backend,
			config,
			lookup: Box::new(lookup),
		}
	}

	pub fn backend(&self) -> &B {
		&self.backend
	}

	pub fn config(&self) -> &BootstrapConfig {
		&self.config
	}

	/// Startup flags for this run: the baseline with environment toggles
	/// applied.
	pub fn startup_flags(&self) -> StartupFlags {
		StartupFlags::from_environment(|name| (self.lookup)(name))
	}

	/// Installed-runtimes root with environment references expanded, as an
	/// absolute path.
	///
	/// `None` when the template names a variable that is not set or the root
	/// does not exist.
	pub fn runtimes_root(&self) -> Option<String> {
		let template = &self.config.runtimes_root;
		let root = match env::expand_references_with(template, |name| (self.lookup)(name)) {
			Ok(root) => root,
			Err(PalError::NoReferences(_)) => template.clone(),
			Err(error) => {
				warn!(template = %template, %error, "cannot resolve installed runtimes root");
				return None;
			}
		};
		match fs::absolute_path(&root) {
			Ok(absolute) => Some(absolute),
			Err(error) => {
				debug!(root = %root, %error, "installed runtimes root not found");
				None
			}
		}
	}

	/// Finds and loads a runtime for an executable living in `executable_dir`.
	///
	/// The executable's own directory is tried first with no version
	/// requirement. Otherwise installed runtimes at or above the minimum are
	/// tried in ascending version order, and the first that loads wins.
	pub fn discover(&self, executable_dir: &str) -> Option<RuntimeInstance<B>> {
		let library_name = &self.config.library_name;

		match load_runtime(&self.backend, executable_dir, library_name, None) {
			Ok(runtime) => {
				info!(root = executable_dir, "using self-contained runtime");
				return Some(runtime);
			}
			Err(LoadError::MissingLibrary(_)) => {
				debug!(root = executable_dir, "no runtime beside executable");
			}
			Err(error) => {
				warn!(root = executable_dir, %error, "runtime beside executable failed to load");
			}
		}

		let root = self.runtimes_root()?;
		let candidates = locate_runtimes(&root, &self.config.minimum_version, library_name);
		debug!(root = %root, candidates = candidates.len(), minimum = %self.config.minimum_version, "located installed runtimes");

		for candidate in candidates {
			let directory = candidate.root().to_owned();
			match load_candidate(&self.backend, candidate) {
				Ok(runtime) => {
					info!(
						root = %directory,
						version = ?runtime.version().map(ToString::to_string),
						"using installed runtime"
					);
					return Some(runtime);
				}
				Err(error) => warn!(root = %directory, %error, "installed runtime failed to load"),
			}
		}
		None
	}

	/// Runs `executable` under a hosted runtime and returns its exit code.
	pub fn run(&self, executable: &str, args: &[String]) -> Result<i32, BootstrapError> {
		if !fs::file_exists(executable) {
			return Err(BootstrapError::TargetNotFound(executable.to_owned()));
		}
		let invalid = |source| BootstrapError::InvalidTarget {
			path: executable.to_owned(),
			source,
		};
		let executable = fs::absolute_path(executable).map_err(invalid)?;
		let executable_dir = path::parent_directory(&executable).map_err(invalid)?.to_owned();

		let mut runtime = self
			.discover(&executable_dir)
			.ok_or_else(|| BootstrapError::RuntimeNotFound {
				library: self.config.library_name.clone(),
			})?;

		let flags = self.startup_flags();
		{
			let host = runtime.acquire_host(&self.backend)?;
			host.set_startup_flags(flags).map_err(failed(HostStage::SetStartupFlags))?;
			host.start().map_err(failed(HostStage::Start))?;
		}
		runtime.mark_host_started();
		debug!(flags = ?flags, "runtime host started");

		let assemblies = AssemblyList::build(runtime.directory(), &executable);
		if assemblies.is_empty() {
			return Err(BootstrapError::EmptyAssemblyList);
		}
		let trusted = assemblies.serialize();
		let search_paths = app_search_paths(&executable_dir, runtime.directory());

		let host = runtime.host_mut()?;
		let domain = host
			.create_app_domain_with_manager(
				&executable,
				AppDomainFlags::DEFAULT,
				None,
				&app_domain_properties(&trusted, &search_paths),
			)
			.map_err(failed(HostStage::CreateAppDomain))?;
		debug!(domain = domain.0, "app domain created");

		let exit_code = {
			let _activation = ActivationContext::enter(&executable);
			host.execute_assembly(domain, &executable, args)
				.map_err(failed(HostStage::ExecuteAssembly))?
		};
		info!(exit_code, "managed entry point returned");

		host.unload_app_domain(domain, true)
			.map_err(failed(HostStage::UnloadAppDomain))?;
		host.stop().map_err(failed(HostStage::Stop))?;
		runtime.release_host();

		Ok(exit_code as i32)
	}
}

fn failed(stage: HostStage) -> impl FnOnce(HResult) -> BootstrapError {
	move |status| BootstrapError::Host { stage, status }
}

/// Search path value shared by every app-domain property except the trusted
/// assembly list.
pub fn app_search_paths(executable_dir: &str, runtime_dir: &str) -> String {
	path::NATIVE.join_list([executable_dir, runtime_dir, NATIVE_IMAGE_PATH_ENTRY, executable_dir])
}

/// App-domain properties keyed by [`PROPERTY_KEYS`], in order.
pub fn app_domain_properties<'p>(trusted_assemblies: &'p str, search_paths: &'p str) -> [(&'static str, &'p str); 5] {
	let [tpa, app_paths, app_ni_paths, native_dirs, winmetadata] = PROPERTY_KEYS;
	[
		(tpa, trusted_assemblies),
		(app_paths, search_paths),
		(app_ni_paths, search_paths),
		(native_dirs, search_paths),
		(winmetadata, search_paths),
	]
}
