//! Display connection trait
//!
//! This module defines the primitives every display backend must provide to
//! the window core. They stay close to the core protocol requests; the hint
//! helpers at the bottom are provided methods built on the property
//! primitives, the same way Xlib layers them.

use crate::protocol::*;
use std::error::Error;
use std::time::Duration;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Native window creation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct NativeWindowParams {
    pub parent: NativeHandle,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// North-west bit and window gravity
    pub gravity_north_west: bool,
    /// Ask the server to save what is under the window (tool windows)
    pub save_under: bool,
    /// Bypass window manager placement (caption-less popups)
    pub override_redirect: bool,
    /// Create with the display's custom visual/colormap, if it has one
    pub custom_visual: bool,
}

/// Geometry/stacking change request; `None` leaves a field untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowConfig {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl WindowConfig {
    pub fn move_resize(x: i32, y: i32, width: u32, height: u32) -> Self {
        WindowConfig {
            x: Some(x),
            y: Some(y),
            width: Some(width),
            height: Some(height),
        }
    }
}

/// The display connection.
///
/// One connection is shared by every window and thread of the process, so
/// all methods take `&self` and implementations serialize internally. Every
/// call may fail; callers propagate the error synchronously.
pub trait DisplayConnection: Send + Sync {
    /// Interned protocol atoms for this connection
    fn atoms(&self) -> &Atoms;

    /// Root window of the default screen
    fn root_window(&self) -> NativeHandle;

    /// Hidden placeholder parent for child windows that have no parent yet
    fn foster_parent(&self) -> NativeHandle;

    /// Whether the display was opened with a custom visual/colormap
    fn has_custom_visual(&self) -> bool {
        false
    }

    fn intern_atom(&self, name: &str) -> BackendResult<Atom>;

    // Window operations

    /// Create a window. A `NONE` handle means the server refused it.
    fn create_window(&self, params: &NativeWindowParams) -> BackendResult<NativeHandle>;

    fn destroy_window(&self, window: NativeHandle) -> BackendResult<()>;

    fn map_window(&self, window: NativeHandle) -> BackendResult<()>;

    /// Map and raise to the top of the stack
    fn map_raised(&self, window: NativeHandle) -> BackendResult<()> {
        self.map_window(window)
    }

    fn unmap_window(&self, window: NativeHandle) -> BackendResult<()>;

    fn configure_window(&self, window: NativeHandle, config: WindowConfig) -> BackendResult<()>;

    fn select_input(&self, window: NativeHandle, event_mask: u32) -> BackendResult<()>;

    fn get_geometry(&self, window: NativeHandle) -> BackendResult<Geometry>;

    fn get_map_state(&self, window: NativeHandle) -> BackendResult<MapState>;

    /// Parent of a window in the native tree (the WM frame for reparented
    /// top-levels)
    fn query_parent(&self, window: NativeHandle) -> BackendResult<NativeHandle>;

    fn translate_coordinates(
        &self,
        src: NativeHandle,
        dst: NativeHandle,
        x: i32,
        y: i32,
    ) -> BackendResult<(i32, i32)>;

    // Properties

    /// Replace the whole value of a property. Nothing in the window core
    /// appends.
    fn change_property(
        &self,
        window: NativeHandle,
        property: Atom,
        value: &PropertyValue,
    ) -> BackendResult<()>;

    /// Read a property. `None` when it is not set.
    fn get_property(
        &self,
        window: NativeHandle,
        property: Atom,
        type_: Atom,
    ) -> BackendResult<Option<PropertyValue>>;

    fn delete_property(&self, window: NativeHandle, property: Atom) -> BackendResult<()>;

    /// Legacy `WM_NAME` write (`XStoreName`). The text is sent as Latin-1.
    fn store_name(&self, window: NativeHandle, name: &str) -> BackendResult<()> {
        let bytes: Vec<u8> = name
            .chars()
            .map(|c| if (c as u32) < 0x100 { c as u8 } else { b'?' })
            .collect();
        self.change_property(
            window,
            Atom::WM_NAME,
            &PropertyValue::from_bytes(Atom::STRING, &bytes),
        )
    }

    // Client messages

    /// Send a format-32 client message about `window` to `destination`
    /// with the given event mask.
    fn send_client_message(
        &self,
        destination: NativeHandle,
        window: NativeHandle,
        type_: Atom,
        data: [u32; 5],
        event_mask: u32,
    ) -> BackendResult<()>;

    /// Ask the window manager to iconify a top-level window
    /// (ICCCM `WM_CHANGE_STATE` to `IconicState`).
    fn iconify_window(&self, window: NativeHandle) -> BackendResult<()> {
        let change_state = self.atoms().WM_CHANGE_STATE;
        self.send_client_message(
            self.root_window(),
            window,
            change_state,
            [wm_hints::ICONIC_STATE, 0, 0, 0, 0],
            event_mask::SUBSTRUCTURE_REDIRECT | event_mask::SUBSTRUCTURE_NOTIFY,
        )
    }

    // Events

    /// Block until the next native event arrives
    fn wait_for_event(&self) -> BackendResult<NativeEvent>;

    /// Wait at most `timeout` for an event
    fn poll_event(&self, timeout: Duration) -> BackendResult<Option<NativeEvent>>;

    /// Flush buffered requests to the server
    fn flush(&self) -> BackendResult<()>;

    // Window manager hints, built on the property primitives

    fn set_wm_normal_hints(&self, window: NativeHandle, hints: &SizeHints) -> BackendResult<()> {
        self.change_property(window, Atom::WM_NORMAL_HINTS, &hints.to_property())
    }

    fn get_wm_normal_hints(&self, window: NativeHandle) -> BackendResult<SizeHints> {
        Ok(self
            .get_property(window, Atom::WM_NORMAL_HINTS, Atom::WM_SIZE_HINTS)?
            .map(|p| SizeHints::from_property(&p))
            .unwrap_or_default())
    }

    fn set_zoom_hints(&self, window: NativeHandle, hints: &SizeHints) -> BackendResult<()> {
        self.change_property(window, Atom::WM_ZOOM_HINTS, &hints.to_property())
    }

    fn set_wm_hints(&self, window: NativeHandle, hints: &WmHints) -> BackendResult<()> {
        self.change_property(window, Atom::WM_HINTS, &hints.to_property())
    }

    fn set_transient_for(&self, window: NativeHandle, owner: NativeHandle) -> BackendResult<()> {
        self.change_property(
            window,
            Atom::WM_TRANSIENT_FOR,
            &PropertyValue::from_u32s(Atom::WINDOW, &[owner.get()]),
        )
    }

    fn set_wm_protocols(&self, window: NativeHandle, protocols: &[Atom]) -> BackendResult<()> {
        let wm_protocols = self.atoms().WM_PROTOCOLS;
        self.change_property(window, wm_protocols, &PropertyValue::from_atoms(protocols))
    }
}
