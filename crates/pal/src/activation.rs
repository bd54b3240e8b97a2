//! Scoped activation contexts.

use std::path::Path;

use tracing::debug;

use crate::sys::{Native, Platform};

/// Activation context derived from an executable, held for one call.
///
/// Entering is best effort: an executable without a usable manifest simply
/// runs without a context. The context is left when the guard drops.
pub struct ActivationContext {
	cookie: Option<<Native as Platform>::ActivationCookie>,
}

impl ActivationContext {
	pub fn enter(executable: &str) -> Self {
		let cookie = match Native::activate(Path::new(executable)) {
			Ok(cookie) => cookie,
			Err(error) => {
				debug!(executable, %error, "running without activation context");
				None
			}
		};
		Self { cookie }
	}

	pub fn is_active(&self) -> bool {
		self.cookie.is_some()
	}
}

impl Drop for ActivationContext {
	fn drop(&mut self) {
		if let Some(cookie) = self.cookie.take() {
			Native::deactivate(cookie);
		}
	}
}
