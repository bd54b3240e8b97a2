//! End-to-end bootstrap runs against a recording fake runtime.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clrboot_host::host::PROPERTY_KEYS;
use clrboot_host::{
	AppDomainFlags, BootstrapConfig, BootstrapError, Bootstrapper, DomainId, HResult, HostStage, RuntimeBackend, RuntimeHost,
	RuntimeVersion, StartupFlags,
};
use clrboot_pal::{PalError, fs, path};
use pretty_assertions::assert_eq;
use serial_test::serial;

const LIBRARY: &str = "libfakeclr.so";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
	Open(String),
	SetStartupFlags(StartupFlags),
	Start,
	CreateAppDomain {
		name: String,
		flags: AppDomainFlags,
		properties: Vec<(String, String)>,
	},
	Execute {
		domain: DomainId,
		path: String,
		args: Vec<String>,
	},
	Unload {
		domain: DomainId,
		wait: bool,
	},
	Stop,
	Release,
}

type Log = Rc<RefCell<Vec<Call>>>;

#[derive(Default)]
struct FakeBackend {
	log: Log,
	broken: Vec<String>,
	fail_stage: Option<HostStage>,
	exit_code: u32,
}

impl FakeBackend {
	fn calls(&self) -> Vec<Call> {
		self.log.borrow().clone()
	}

	fn opened(&self) -> Vec<String> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				Call::Open(path) => Some(path),
				_ => None,
			})
			.collect()
	}
}

impl RuntimeBackend for FakeBackend {
	type Library = String;
	type Host = FakeHost;

	fn open(&self, library_path: &str) -> Result<String, PalError> {
		self.log.borrow_mut().push(Call::Open(library_path.to_owned()));
		if self.broken.iter().any(|b| b == library_path) {
			return Err(PalError::LibraryLoad {
				path: PathBuf::from(library_path),
				reason: "not a runtime".to_owned(),
			});
		}
		Ok(library_path.to_owned())
	}

	fn host(&self, _library: &String) -> Result<FakeHost, BootstrapError> {
		Ok(FakeHost {
			log: Rc::clone(&self.log),
			fail_stage: self.fail_stage,
			exit_code: self.exit_code,
		})
	}
}

struct FakeHost {
	log: Log,
	fail_stage: Option<HostStage>,
	exit_code: u32,
}

impl FakeHost {
	fn step(&self, stage: HostStage, call: Call) -> Result<(), HResult> {
		self.log.borrow_mut().push(call);
		if self.fail_stage == Some(stage) {
			return Err(HResult::E_FAIL);
		}
		Ok(())
	}
}

impl RuntimeHost for FakeHost {
	fn set_startup_flags(&mut self, flags: StartupFlags) -> Result<(), HResult> {
		self.step(HostStage::SetStartupFlags, Call::SetStartupFlags(flags))
	}

	fn start(&mut self) -> Result<(), HResult> {
		self.step(HostStage::Start, Call::Start)
	}

	fn create_app_domain_with_manager(
		&mut self,
		friendly_name: &str,
		flags: AppDomainFlags,
		manager: Option<(&str, &str)>,
		properties: &[(&str, &str)],
	) -> Result<DomainId, HResult> {
		assert!(manager.is_none());
		self.step(
			HostStage::CreateAppDomain,
			Call::CreateAppDomain {
				name: friendly_name.to_owned(),
				flags,
				properties: properties
					.iter()
					.map(|(k, v)| (k.to_string(), v.to_string()))
					.collect(),
			},
		)?;
		Ok(DomainId(7))
	}

	fn execute_assembly(&mut self, domain: DomainId, assembly_path: &str, args: &[String]) -> Result<u32, HResult> {
		self.step(
			HostStage::ExecuteAssembly,
			Call::Execute {
				domain,
				path: assembly_path.to_owned(),
				args: args.to_vec(),
			},
		)?;
		Ok(self.exit_code)
	}

	fn unload_app_domain(&mut self, domain: DomainId, wait: bool) -> Result<(), HResult> {
		self.step(HostStage::UnloadAppDomain, Call::Unload { domain, wait })
	}

	fn stop(&mut self) -> Result<(), HResult> {
		self.step(HostStage::Stop, Call::Stop)
	}

	fn release(self) {
		self.log.borrow_mut().push(Call::Release);
	}
}

/// A scratch layout with `apps/foo/foo.exe` and an installed-runtimes root.
struct Layout {
	_dir: tempfile::TempDir,
	base: PathBuf,
	app_dir: PathBuf,
	executable: String,
	runtimes: String,
}

impl Layout {
	fn new() -> Self {
		let dir = tempfile::tempdir().unwrap();
		let base = PathBuf::from(fs::absolute_path(dir.path()).unwrap());
		let app_dir = base.join("apps").join("foo");
		std::fs::create_dir_all(&app_dir).unwrap();
		let executable = app_dir.join("foo.exe");
		std::fs::write(&executable, b"").unwrap();

		let runtimes = base.join("runtimes");
		std::fs::create_dir_all(&runtimes).unwrap();

		Self {
			base,
			app_dir,
			executable: executable.to_str().unwrap().to_owned(),
			runtimes: runtimes.to_str().unwrap().to_owned(),
			_dir: dir,
		}
	}

	fn install(&self, version: &str, files: &[&str]) -> String {
		let root = Path::new(&self.runtimes).join(version);
		std::fs::create_dir_all(&root).unwrap();
		for file in files.iter().chain([&LIBRARY]) {
			std::fs::write(root.join(file), b"").unwrap();
		}
		library_in(root.to_str().unwrap())
	}

	fn config(&self, minimum: RuntimeVersion) -> BootstrapConfig {
		BootstrapConfig::default()
			.with_minimum_version(minimum)
			.with_runtimes_root(self.runtimes.clone())
			.with_library_name(LIBRARY)
	}
}

fn library_in(dir: &str) -> String {
	path::combine(dir, LIBRARY).unwrap()
}

fn environment(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + 'static {
	let map: HashMap<String, String> = pairs
		.iter()
		.map(|(k, v)| (k.to_string(), v.to_string()))
		.collect();
	move |name| map.get(name).cloned()
}

#[test]
fn test_lowest_qualifying_runtime_wins() {
	let layout = Layout::new();
	let lowest = layout.install("2.0.0", &["System.Private.CoreLib.dll"]);
	layout.install("2.1.5", &[]);

	let backend = FakeBackend {
		exit_code: 42,
		..Default::default()
	};
	let boot = Bootstrapper::with_environment(backend, layout.config(RuntimeVersion::new(2, 0, 0)), environment(&[]));
	let args = vec!["--flag".to_owned(), "two words".to_owned()];
	let code = boot.run(&layout.executable, &args).unwrap();

	assert_eq!(code, 42);
	assert_eq!(boot.backend().opened(), vec![lowest]);

	let executable = fs::absolute_path(&layout.executable).unwrap();
	let calls = boot.backend().calls();
	assert_eq!(calls[1], Call::SetStartupFlags(StartupFlags::BASELINE));
	assert_eq!(calls[2], Call::Start);
	assert_eq!(
		calls[4..],
		[
			Call::Execute {
				domain: DomainId(7),
				path: executable.clone(),
				args,
			},
			Call::Unload {
				domain: DomainId(7),
				wait: true,
			},
			Call::Stop,
			Call::Release,
		]
	);

	let Call::CreateAppDomain { name, flags, properties } = &calls[3] else {
		panic!("expected app domain creation, got {:?}", calls[3]);
	};
	assert_eq!(name, &executable);
	assert_eq!(*flags, AppDomainFlags::DEFAULT);
	let keys: Vec<&str> = properties.iter().map(|(k, _)| k.as_str()).collect();
	assert_eq!(keys, PROPERTY_KEYS);

	let sep = path::NATIVE.list_separator();
	let trusted: Vec<&str> = properties[0].1.split(sep).collect();
	assert_eq!(trusted.len(), 2);
	assert!(trusted[0].ends_with("System.Private.CoreLib.dll"));
	assert_eq!(trusted[1], executable);

	let app_dir = path::parent_directory(&executable).unwrap();
	let search: Vec<&str> = properties[1].1.split(sep).collect();
	assert_eq!(search[0], app_dir);
	assert!(search[1].ends_with("2.0.0"));
	assert_eq!(search[2..], ["NI", app_dir]);
}

#[test]
fn test_self_contained_runtime_is_preferred() {
	let layout = Layout::new();
	layout.install("2.0.0", &[]);
	std::fs::write(layout.app_dir.join(LIBRARY), b"").unwrap();

	let boot = Bootstrapper::with_environment(
		FakeBackend::default(),
		layout.config(RuntimeVersion::new(9, 0, 0)),
		environment(&[]),
	);
	assert_eq!(boot.run(&layout.executable, &[]).unwrap(), 0);

	let opened = boot.backend().opened();
	assert_eq!(opened.len(), 1);
	let app_dir = fs::absolute_path(&layout.app_dir).unwrap();
	assert_eq!(opened[0], library_in(&app_dir));
}

#[test]
fn test_failed_candidate_falls_through_to_next() {
	let layout = Layout::new();
	let broken = layout.install("2.0.0", &[]);
	let working = layout.install("2.1.5", &[]);

	let backend = FakeBackend {
		broken: vec![broken.clone()],
		..Default::default()
	};
	let boot = Bootstrapper::with_environment(backend, layout.config(RuntimeVersion::new(2, 0, 0)), environment(&[]));
	boot.run(&layout.executable, &[]).unwrap();

	assert_eq!(boot.backend().opened(), vec![broken, working]);
}

#[test]
fn test_no_runtime_above_minimum() {
	let layout = Layout::new();
	layout.install("1.9.0", &[]);

	let boot = Bootstrapper::with_environment(
		FakeBackend::default(),
		layout.config(RuntimeVersion::new(2, 0, 0)),
		environment(&[]),
	);
	let err = boot.run(&layout.executable, &[]).unwrap_err();

	assert!(matches!(err, BootstrapError::RuntimeNotFound { .. }));
	assert_eq!(err.to_string(), format!("{LIBRARY} not found"));
	assert!(boot.backend().calls().is_empty());
}

#[test]
fn test_runtimes_root_is_expanded() {
	let layout = Layout::new();
	let installed = layout.install("3.0.0", &[]);

	let config = layout.config(RuntimeVersion::default()).with_runtimes_root("${FAKE_RUNTIMES}");
	let lookup = environment(&[("FAKE_RUNTIMES", layout.runtimes.as_str())]);
	#[cfg(windows)]
	let config = config.with_runtimes_root("%FAKE_RUNTIMES%");

	let boot = Bootstrapper::with_environment(FakeBackend::default(), config, lookup);
	boot.run(&layout.executable, &[]).unwrap();
	assert_eq!(boot.backend().opened(), vec![installed]);
}

#[test]
fn test_unset_runtimes_root_variable_is_not_found() {
	let layout = Layout::new();
	layout.install("3.0.0", &[]);

	#[cfg(windows)]
	let template = "%FAKE_RUNTIMES%";
	#[cfg(not(windows))]
	let template = "${FAKE_RUNTIMES}";
	let config = layout.config(RuntimeVersion::default()).with_runtimes_root(template);

	let boot = Bootstrapper::with_environment(FakeBackend::default(), config, environment(&[]));
	let err = boot.run(&layout.executable, &[]).unwrap_err();
	assert!(matches!(err, BootstrapError::RuntimeNotFound { .. }));
}

#[test]
#[serial]
fn test_relative_runtimes_root_yields_absolute_paths() {
	let layout = Layout::new();
	layout.install("2.0.0", &["System.Runtime.dll"]);
	let config = layout.config(RuntimeVersion::default()).with_runtimes_root("runtimes");
	let boot = Bootstrapper::with_environment(FakeBackend::default(), config, environment(&[]));

	let previous = std::env::current_dir().unwrap();
	std::env::set_current_dir(&layout.base).unwrap();
	let result = boot.run(&layout.executable, &[]);
	std::env::set_current_dir(previous).unwrap();
	result.unwrap();

	let opened = boot.backend().opened();
	assert_eq!(opened.len(), 1);
	assert!(Path::new(&opened[0]).is_absolute());

	let calls = boot.backend().calls();
	let Call::CreateAppDomain { properties, .. } = &calls[3] else {
		panic!("expected app domain creation, got {:?}", calls[3]);
	};
	let sep = path::NATIVE.list_separator();
	let trusted: Vec<&str> = properties[0].1.split(sep).collect();
	assert_eq!(trusted.len(), 2);
	assert!(trusted.iter().all(|entry| Path::new(entry).is_absolute()));

	let search: Vec<&str> = properties[1].1.split(sep).filter(|entry| *entry != "NI").collect();
	assert_eq!(search.len(), 3);
	assert!(search.iter().all(|entry| Path::new(entry).is_absolute()));
}

#[test]
fn test_missing_runtimes_root_is_not_found() {
	let layout = Layout::new();
	let config = layout
		.config(RuntimeVersion::default())
		.with_runtimes_root(layout.base.join("absent").to_str().unwrap());

	let boot = Bootstrapper::with_environment(FakeBackend::default(), config, environment(&[]));
	assert_eq!(boot.runtimes_root(), None);
	let err = boot.run(&layout.executable, &[]).unwrap_err();
	assert!(matches!(err, BootstrapError::RuntimeNotFound { .. }));
}

#[test]
fn test_server_gc_toggle_reaches_host() {
	let layout = Layout::new();
	layout.install("2.0.0", &[]);

	let boot = Bootstrapper::with_environment(
		FakeBackend::default(),
		layout.config(RuntimeVersion::default()),
		environment(&[("CORECLR_SERVER_GC", "TRUE")]),
	);
	boot.run(&layout.executable, &[]).unwrap();

	let Call::SetStartupFlags(flags) = boot.backend().calls()[1] else {
		panic!("startup flags were not set second");
	};
	assert!(flags.contains(StartupFlags::SERVER_GC));
	assert!(flags.contains(StartupFlags::BASELINE));
}

#[test]
fn test_missing_target() {
	let layout = Layout::new();
	layout.install("2.0.0", &[]);

	let boot = Bootstrapper::with_environment(
		FakeBackend::default(),
		layout.config(RuntimeVersion::default()),
		environment(&[]),
	);
	let missing = layout.app_dir.join("absent.exe");
	let err = boot.run(missing.to_str().unwrap(), &[]).unwrap_err();

	assert!(matches!(err, BootstrapError::TargetNotFound(_)));
	assert!(boot.backend().calls().is_empty());
}

#[test]
fn test_host_failure_aborts_sequence() {
	let layout = Layout::new();
	layout.install("2.0.0", &[]);

	let backend = FakeBackend {
		fail_stage: Some(HostStage::Start),
		..Default::default()
	};
	let boot = Bootstrapper::with_environment(backend, layout.config(RuntimeVersion::default()), environment(&[]));
	let err = boot.run(&layout.executable, &[]).unwrap_err();

	assert_eq!(err.status(), Some(HResult::E_FAIL));
	assert_eq!(err.to_string(), "Start failed. ERRORCODE: 0x80004005");

	let calls = boot.backend().calls();
	assert_eq!(calls.len(), 3);
	assert_eq!(calls[2], Call::Start);
}

#[test]
fn test_execute_failure_skips_teardown() {
	let layout = Layout::new();
	layout.install("2.0.0", &[]);

	let backend = FakeBackend {
		fail_stage: Some(HostStage::ExecuteAssembly),
		..Default::default()
	};
	let boot = Bootstrapper::with_environment(backend, layout.config(RuntimeVersion::default()), environment(&[]));
	let err = boot.run(&layout.executable, &[]).unwrap_err();

	assert!(matches!(
		err,
		BootstrapError::Host {
			stage: HostStage::ExecuteAssembly,
			..
		}
	));
	assert!(matches!(boot.backend().calls().last(), Some(Call::Execute { .. })));
}

#[test]
#[serial]
fn test_process_environment_toggles() {
	// SAFETY: serialized with every other test touching the environment.
	unsafe {
		std::env::set_var("CORECLR_SERVER_GC", "1");
		std::env::set_var("CORECLR_CONCURRENT_GC", "false");
	}
	let boot = Bootstrapper::new(FakeBackend::default(), BootstrapConfig::default());
	let flags = boot.startup_flags();
	unsafe {
		std::env::remove_var("CORECLR_SERVER_GC");
		std::env::remove_var("CORECLR_CONCURRENT_GC");
	}

	assert!(flags.contains(StartupFlags::SERVER_GC));
	assert!(!flags.contains(StartupFlags::CONCURRENT_GC));
}
