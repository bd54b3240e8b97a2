//! `clrboot` launcher binary.
//!
//! Boots a managed executable on the runtime beside it or on the lowest
//! installed runtime that satisfies the requested minimum version, and exits
//! with the managed entry point's exit code.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use clrboot_host::{BootstrapConfig, Bootstrapper, ClrBackend, FAILURE_EXIT_CODE, RuntimeVersion};
use clrboot_pal::{fs, sys};
use tracing::{debug, info};

/// Launcher command line arguments.
#[derive(Parser, Debug)]
#[command(name = "clrboot")]
#[command(about = "Run a managed executable on a discovered runtime")]
struct Args {
	/// Managed executable to run
	#[arg(value_name = "EXECUTABLE")]
	executable: String,

	/// Arguments forwarded to the managed entry point
	#[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
	args: Vec<String>,

	/// Lowest installed runtime version to accept
	#[arg(long, value_name = "VERSION", default_value = "0.0.0")]
	min_runtime_version: RuntimeVersion,

	/// Installed runtimes root; environment references are expanded
	#[arg(long, value_name = "TEMPLATE")]
	runtimes_root: Option<String>,

	/// Block until a debugger attaches before booting the runtime
	#[arg(long)]
	wait_for_debugger: bool,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

fn main() {
	let args = Args::parse();

	if let Err(error) = setup_tracing(args.verbose) {
		eprintln!("WARNING - {error:#}");
	}
	debug!(
		launcher = ?fs::own_executable_name().ok(),
		cwd = ?fs::current_dir().ok(),
		"starting clrboot"
	);

	if args.wait_for_debugger {
		wait_for_debugger();
	}

	let mut config = BootstrapConfig::default().with_minimum_version(args.min_runtime_version);
	if let Some(root) = args.runtimes_root {
		config = config.with_runtimes_root(root);
	}

	let code = match Bootstrapper::new(ClrBackend, config).run(&args.executable, &args.args) {
		Ok(code) => code,
		Err(error) => {
			eprintln!("ERROR - {error}");
			FAILURE_EXIT_CODE
		}
	};
	std::process::exit(code);
}

fn wait_for_debugger() {
	info!(pid = std::process::id(), "waiting for debugger to attach");
	while !sys::is_debugger_present() {
		std::thread::sleep(Duration::from_millis(100));
	}
	info!("debugger attached");
}

/// Installs the global subscriber.
///
/// `CLRBOOT_LOG` overrides the filter. With `CLRBOOT_LOG_DIR` set, output goes
/// to `clrboot.<pid>.log` in that directory instead of stderr. If the log file
/// cannot be opened, stderr logging is installed and the error returned.
fn setup_tracing(verbose: bool) -> anyhow::Result<()> {
	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	let filter = EnvFilter::try_from_env("CLRBOOT_LOG").unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("clrboot=trace,clrboot_host=debug,clrboot_pal=debug,info")
		} else {
			EnvFilter::new("clrboot=info,clrboot_host=info,warn")
		}
	});

	let log_file = std::env::var_os("CLRBOOT_LOG_DIR").map(|dir| open_log_file(Path::new(&dir)));
	if let Some(Ok((file, log_path))) = log_file {
		let file_layer = tracing_subscriber::fmt::layer()
			.with_writer(file)
			.with_ansi(false)
			.with_target(true);

		tracing_subscriber::registry()
			.with(filter)
			.with(file_layer)
			.try_init()
			.context("tracing already initialized")?;

		info!(path = ?log_path, "clrboot tracing initialized");
		return Ok(());
	}

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.try_init()
		.map_err(|e| anyhow::anyhow!(e))
		.context("tracing already initialized")?;

	match log_file {
		Some(Err(error)) => Err(error),
		_ => Ok(()),
	}
}

fn open_log_file(log_dir: &Path) -> anyhow::Result<(File, PathBuf)> {
	std::fs::create_dir_all(log_dir).with_context(|| format!("cannot create log directory {}", log_dir.display()))?;
	let log_path = log_dir.join(format!("clrboot.{}.log", std::process::id()));
	let file = OpenOptions::new()
		.create(true)
		.append(true)
		.open(&log_path)
		.with_context(|| format!("cannot open log file {}", log_path.display()))?;
	Ok((file, log_path))
}
