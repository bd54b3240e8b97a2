//! Binding to the runtime's exported host control interface.

use std::ffi::c_void;
use std::ptr::{self, NonNull};

use clrboot_pal::{DynamicLibrary, PalError};
use tracing::debug;

use super::{AppDomainFlags, DomainId, HResult, HostStage, RuntimeHost, StartupFlags};
use crate::error::BootstrapError;
use crate::loader::RuntimeBackend;

const HOST_ENTRY_POINT: &str = "GetCLRRuntimeHost";

#[repr(C)]
struct Guid {
	data1: u32,
	data2: u16,
	data3: u16,
	data4: [u8; 8],
}

/// {712AB73F-2C22-4807-AD7E-F501D7B72C2D}
const IID_ICLR_RUNTIME_HOST2: Guid = Guid {
	data1: 0x712A_B73F,
	data2: 0x2C22,
	data3: 0x4807,
	data4: [0xAD, 0x7E, 0xF5, 0x01, 0xD7, 0xB7, 0x2C, 0x2D],
};

type Wide = *const u16;
type GetHostFn = unsafe extern "system" fn(riid: *const Guid, host: *mut *mut c_void) -> i32;

#[repr(C)]
struct RawHost {
	vtbl: *const HostVtbl,
}

/// `ICLRRuntimeHost2` slot layout. Slots this host never calls are kept as
/// opaque pointers to preserve offsets.
#[repr(C)]
struct HostVtbl {
	_query_interface: *const c_void,
	_add_ref: *const c_void,
	release: unsafe extern "system" fn(this: *mut RawHost) -> u32,
	start: unsafe extern "system" fn(this: *mut RawHost) -> i32,
	stop: unsafe extern "system" fn(this: *mut RawHost) -> i32,
	_set_host_control: *const c_void,
	_get_clr_control: *const c_void,
	unload_app_domain: unsafe extern "system" fn(this: *mut RawHost, domain: u32, wait: i32) -> i32,
	_execute_in_app_domain: *const c_void,
	_get_current_app_domain_id: *const c_void,
	_execute_application: *const c_void,
	_execute_in_default_app_domain: *const c_void,
	create_app_domain_with_manager: unsafe extern "system" fn(
		this: *mut RawHost,
		friendly_name: Wide,
		flags: u32,
		manager_assembly: Wide,
		manager_type: Wide,
		property_count: i32,
		keys: *const Wide,
		values: *const Wide,
		domain: *mut u32,
	) -> i32,
	_create_delegate: *const c_void,
	_authenticate: *const c_void,
	_register_mac_eh_port: *const c_void,
	set_startup_flags: unsafe extern "system" fn(this: *mut RawHost, flags: u32) -> i32,
	_dll_get_activation_factory: *const c_void,
	execute_assembly: unsafe extern "system" fn(
		this: *mut RawHost,
		domain: u32,
		assembly_path: Wide,
		argc: i32,
		argv: *const Wide,
		exit_code: *mut u32,
	) -> i32,
}

/// NUL-terminated UTF-16, the string form the host interface takes on every
/// platform.
fn wide(s: &str) -> Vec<u16> {
	s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Owned reference to a runtime's `ICLRRuntimeHost2`.
///
/// Not released on drop: the reference is given up through
/// [`RuntimeHost::release`] at the end of a successful run, and a failed run
/// exits the process with the runtime still resident.
pub struct ClrRuntimeHost {
	raw: NonNull<RawHost>,
}

impl ClrRuntimeHost {
	/// Asks the runtime library for its host control interface.
	pub fn from_library(library: &DynamicLibrary) -> Result<Self, BootstrapError> {
		// SAFETY: the signature matches the runtime's export, and the library
		// is pinned so the pointer stays valid.
		let get_host: GetHostFn =
			unsafe { library.symbol(HOST_ENTRY_POINT) }.map_err(BootstrapError::HostEntryPoint)?;

		let mut raw: *mut c_void = ptr::null_mut();
		let status = HResult(unsafe { get_host(&IID_ICLR_RUNTIME_HOST2, &mut raw) });
		status.ok().map_err(|status| BootstrapError::Host {
			stage: HostStage::Acquire,
			status,
		})?;

		let raw = NonNull::new(raw.cast::<RawHost>()).ok_or(BootstrapError::Host {
			stage: HostStage::Acquire,
			status: HResult::E_POINTER,
		})?;
		debug!(library = %library.path().display(), "acquired runtime host interface");
		Ok(Self { raw })
	}

	fn this(&self) -> *mut RawHost {
		self.raw.as_ptr()
	}

	fn vtbl(&self) -> &HostVtbl {
		// SAFETY: a live interface pointer always carries a valid vtable.
		unsafe { &*(*self.this()).vtbl }
	}
}

impl RuntimeHost for ClrRuntimeHost {
	fn set_startup_flags(&mut self, flags: StartupFlags) -> Result<(), HResult> {
		HResult(unsafe { (self.vtbl().set_startup_flags)(self.this(), flags.bits()) }).ok()
	}

	fn start(&mut self) -> Result<(), HResult> {
		HResult(unsafe { (self.vtbl().start)(self.this()) }).ok()
	}

	fn create_app_domain_with_manager(
		&mut self,
		friendly_name: &str,
		flags: AppDomainFlags,
		manager: Option<(&str, &str)>,
		properties: &[(&str, &str)],
	) -> Result<DomainId, HResult> {
		let name = wide(friendly_name);
		let manager = manager.map(|(assembly, type_name)| (wide(assembly), wide(type_name)));
		let (manager_assembly, manager_type) = match &manager {
			Some((assembly, type_name)) => (assembly.as_ptr(), type_name.as_ptr()),
			None => (ptr::null(), ptr::null()),
		};

		let keys: Vec<Vec<u16>> = properties.iter().map(|(k, _)| wide(k)).collect();
		let values: Vec<Vec<u16>> = properties.iter().map(|(_, v)| wide(v)).collect();
		let key_ptrs: Vec<Wide> = keys.iter().map(|k| k.as_ptr()).collect();
		let value_ptrs: Vec<Wide> = values.iter().map(|v| v.as_ptr()).collect();

		let mut domain = 0u32;
		HResult(unsafe {
			(self.vtbl().create_app_domain_with_manager)(
				self.this(),
				name.as_ptr(),
				flags.bits(),
				manager_assembly,
				manager_type,
				properties.len() as i32,
				key_ptrs.as_ptr(),
				value_ptrs.as_ptr(),
				&mut domain,
			)
		})
		.ok()?;
		Ok(DomainId(domain))
	}

	fn execute_assembly(&mut self, domain: DomainId, assembly_path: &str, args: &[String]) -> Result<u32, HResult> {
		let path = wide(assembly_path);
		let args: Vec<Vec<u16>> = args.iter().map(|a| wide(a)).collect();
		let argv: Vec<Wide> = args.iter().map(|a| a.as_ptr()).collect();

		let mut exit_code = 0u32;
		HResult(unsafe {
			(self.vtbl().execute_assembly)(
				self.this(),
				domain.0,
				path.as_ptr(),
				argv.len() as i32,
				if argv.is_empty() { ptr::null() } else { argv.as_ptr() },
				&mut exit_code,
			)
		})
		.ok()?;
		Ok(exit_code)
	}

	fn unload_app_domain(&mut self, domain: DomainId, wait: bool) -> Result<(), HResult> {
		HResult(unsafe { (self.vtbl().unload_app_domain)(self.this(), domain.0, i32::from(wait)) }).ok()
	}

	fn stop(&mut self) -> Result<(), HResult> {
		HResult(unsafe { (self.vtbl().stop)(self.this()) }).ok()
	}

	fn release(self) {
		unsafe { (self.vtbl().release)(self.this()) };
	}
}

/// Loads the real runtime library and binds its host interface.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClrBackend;

impl RuntimeBackend for ClrBackend {
	type Library = DynamicLibrary;
	type Host = ClrRuntimeHost;

	fn open(&self, library_path: &str) -> Result<DynamicLibrary, PalError> {
		// The runtime cannot be unloaded once started.
		DynamicLibrary::load(library_path, true)
	}

	fn host(&self, library: &DynamicLibrary) -> Result<ClrRuntimeHost, BootstrapError> {
		ClrRuntimeHost::from_library(library)
	}
}
