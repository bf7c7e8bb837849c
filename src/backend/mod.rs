/// Display backends
///
/// This module contains the display connection trait and its
/// implementations: an in-memory null display and, when the feature is
/// enabled, a connection to a real X server.

mod r#trait;
pub use r#trait::*;

pub mod null;
pub use null::NullDisplay;

#[cfg(all(feature = "backend-x11", target_family = "unix"))]
pub mod x11;
#[cfg(all(feature = "backend-x11", target_family = "unix"))]
pub use x11::X11Display;

use std::sync::Arc;

/// Get available backend names (features enabled + platform compatible)
#[allow(unused_mut)] // mut needed when features are enabled
pub fn available_backends() -> Vec<&'static str> {
    let mut backends = Vec::new();

    // X11 backend is available on Unix systems when feature is enabled
    #[cfg(all(feature = "backend-x11", target_family = "unix"))]
    backends.push("x11");

    backends.push("null");

    backends
}

/// Open a display connection by backend name. `display` is only used by
/// backends that talk to a server.
pub fn open(backend: &str, display: Option<&str>) -> BackendResult<Arc<dyn DisplayConnection>> {
    match backend {
        "null" => Ok(Arc::new(NullDisplay::new())),
        #[cfg(all(feature = "backend-x11", target_family = "unix"))]
        "x11" => Ok(Arc::new(X11Display::connect(display)?)),
        other => {
            let _ = display;
            Err(format!(
                "Unknown backend '{}'. Available: {}",
                other,
                available_backends().join(", ")
            )
            .into())
        }
    }
}
