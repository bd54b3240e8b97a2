use std::os::windows::ffi::OsStrExt;
use std::path::Path;

use libloading::os::windows::Library;
use windows_sys::Win32::Foundation::{HANDLE, HMODULE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::System::ApplicationInstallationAndServicing::{
	ACTCTXW, ActivateActCtx, CreateActCtxW, DeactivateActCtx, ReleaseActCtx,
};
use windows_sys::Win32::System::Diagnostics::Debug::IsDebuggerPresent;
use windows_sys::Win32::System::LibraryLoader::{GET_MODULE_HANDLE_EX_FLAG_PIN, GetModuleHandleExW};

use super::Platform;
use crate::error::{PalError, Result};
use crate::path::{self, PathStyle};

pub struct Windows;

pub struct ActivationCookie {
	context: HANDLE,
	cookie: usize,
}

impl Platform for Windows {
	type ActivationCookie = ActivationCookie;

	const PATH_STYLE: PathStyle = path::WINDOWS;
	const REFERENCE_PATTERN: &'static str = r"%([0-9A-Za-z_\\/\(\)]+)%";

	fn absolute_path(path: &Path) -> Result<String> {
		// canonicalize() yields verbatim `\\?\` paths that the string path
		// algebra and the runtime's list properties do not accept.
		if std::fs::metadata(path).is_err() {
			return Err(PalError::NotFound(path.to_path_buf()));
		}
		let absolute = std::path::absolute(path).map_err(|e| PalError::io(path, e))?;
		absolute.into_os_string().into_string().map_err(|raw| PalError::NotUnicode(raw.into()))
	}

	fn open_library(path: &Path, pin: bool) -> Result<libloading::Library> {
		let library = unsafe { Library::new(path) }.map_err(|e| PalError::LibraryLoad {
			path: path.to_path_buf(),
			reason: e.to_string(),
		})?;

		if pin {
			let wide: Vec<u16> = path.as_os_str().encode_wide().chain(std::iter::once(0)).collect();
			let mut module: HMODULE = std::ptr::null_mut();
			let ok = unsafe { GetModuleHandleExW(GET_MODULE_HANDLE_EX_FLAG_PIN, wide.as_ptr(), &mut module) };
			if ok == 0 {
				return Err(PalError::LibraryPin {
					path: path.to_path_buf(),
					reason: std::io::Error::last_os_error().to_string(),
				});
			}
		}

		Ok(library.into())
	}

	fn is_debugger_present() -> bool {
		unsafe { IsDebuggerPresent() != 0 }
	}

	fn activate(executable: &Path) -> Result<Option<ActivationCookie>> {
		let source: Vec<u16> = executable.as_os_str().encode_wide().chain(std::iter::once(0)).collect();
		let mut descriptor: ACTCTXW = unsafe { std::mem::zeroed() };
		descriptor.cbSize = std::mem::size_of::<ACTCTXW>() as u32;
		descriptor.lpSource = source.as_ptr();

		let context = unsafe { CreateActCtxW(&descriptor) };
		if context == INVALID_HANDLE_VALUE {
			return Err(PalError::io(executable, std::io::Error::last_os_error()));
		}

		let mut cookie = 0usize;
		if unsafe { ActivateActCtx(context, &mut cookie) } == 0 {
			let error = std::io::Error::last_os_error();
			unsafe { ReleaseActCtx(context) };
			return Err(PalError::io(executable, error));
		}

		Ok(Some(ActivationCookie { context, cookie }))
	}

	fn deactivate(cookie: ActivationCookie) {
		unsafe {
			DeactivateActCtx(0, cookie.cookie);
			ReleaseActCtx(cookie.context);
		}
	}
}
