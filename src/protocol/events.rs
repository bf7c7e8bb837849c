//! Native events
//!
//! `NativeEvent` is the record stored in a thread queue's ring buffer. Backends
//! translate their own event types into it, and the paint sub-queue
//! synthesizes `Expose` records from pending paint state.

use super::types::*;
use crate::window::Message;

/// Input event selection masks (bit-identical to the core protocol)
pub mod event_mask {
    pub const KEY_PRESS: u32 = 1 << 0;
    pub const KEY_RELEASE: u32 = 1 << 1;
    pub const BUTTON_PRESS: u32 = 1 << 2;
    pub const BUTTON_RELEASE: u32 = 1 << 3;
    pub const ENTER_WINDOW: u32 = 1 << 4;
    pub const LEAVE_WINDOW: u32 = 1 << 5;
    pub const POINTER_MOTION: u32 = 1 << 6;
    pub const BUTTON_MOTION: u32 = 1 << 13;
    pub const EXPOSURE: u32 = 1 << 15;
    pub const VISIBILITY_CHANGE: u32 = 1 << 16;
    pub const STRUCTURE_NOTIFY: u32 = 1 << 17;
    pub const SUBSTRUCTURE_NOTIFY: u32 = 1 << 19;
    pub const SUBSTRUCTURE_REDIRECT: u32 = 1 << 20;
    pub const FOCUS_CHANGE: u32 = 1 << 21;
    pub const PROPERTY_CHANGE: u32 = 1 << 22;

    /// Mask selected on both the frame and the client window
    pub const STANDARD_INPUT: u32 = KEY_PRESS
        | KEY_RELEASE
        | BUTTON_PRESS
        | BUTTON_RELEASE
        | POINTER_MOTION
        | BUTTON_MOTION
        | ENTER_WINDOW
        | LEAVE_WINDOW
        | EXPOSURE
        | FOCUS_CHANGE
        | VISIBILITY_CHANGE
        | SUBSTRUCTURE_NOTIFY;

    /// Extra bits only the frame needs
    pub const FRAME_EXTRA: u32 = STRUCTURE_NOTIFY | PROPERTY_CHANGE;
}

/// Focus change detail, only the values the pump cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusDetail {
    Nonlinear,
    Other,
}

/// Native event record
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEvent {
    /// Part of a window needs repainting. `area` is `None` when the whole
    /// window is meant (synthesized client paints carry no region).
    Expose {
        window: NativeHandle,
        area: Option<Rect>,
    },
    /// Window geometry changed, possibly adjusted by the window manager
    Configure {
        window: NativeHandle,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        synthetic: bool,
    },
    /// `event` is the window the notification was selected on, `window` the
    /// one that changed (they differ for substructure notifications).
    MapNotify {
        event: NativeHandle,
        window: NativeHandle,
    },
    UnmapNotify {
        event: NativeHandle,
        window: NativeHandle,
    },
    ReparentNotify {
        event: NativeHandle,
        window: NativeHandle,
        parent: NativeHandle,
    },
    DestroyNotify {
        event: NativeHandle,
        window: NativeHandle,
    },
    PropertyNotify {
        window: NativeHandle,
        atom: Atom,
        deleted: bool,
    },
    ClientMessage {
        window: NativeHandle,
        type_: Atom,
        data: [u32; 5],
    },
    FocusIn {
        window: NativeHandle,
        detail: FocusDetail,
    },
    FocusOut {
        window: NativeHandle,
        detail: FocusDetail,
    },
    KeyPress {
        window: NativeHandle,
        keycode: u8,
        state: u16,
        time: u32,
    },
    KeyRelease {
        window: NativeHandle,
        keycode: u8,
        state: u16,
        time: u32,
    },
    ButtonPress {
        window: NativeHandle,
        button: u8,
        state: u16,
        time: u32,
        x: i32,
        y: i32,
    },
    ButtonRelease {
        window: NativeHandle,
        button: u8,
        state: u16,
        time: u32,
        x: i32,
        y: i32,
    },
    MotionNotify {
        window: NativeHandle,
        state: u16,
        time: u32,
        x: i32,
        y: i32,
    },
    EnterNotify {
        window: NativeHandle,
        x: i32,
        y: i32,
    },
    LeaveNotify {
        window: NativeHandle,
        x: i32,
        y: i32,
    },
    /// Application message posted through a thread queue
    Posted(Message),
}

impl NativeEvent {
    /// The window this event is routed by.
    ///
    /// Structure notifications are routed by the window that was selected on
    /// (`event`), so a parent hears about its children. Posted messages have
    /// no native window.
    pub fn window(&self) -> NativeHandle {
        match self {
            NativeEvent::Expose { window, .. }
            | NativeEvent::Configure { window, .. }
            | NativeEvent::PropertyNotify { window, .. }
            | NativeEvent::ClientMessage { window, .. }
            | NativeEvent::FocusIn { window, .. }
            | NativeEvent::FocusOut { window, .. }
            | NativeEvent::KeyPress { window, .. }
            | NativeEvent::KeyRelease { window, .. }
            | NativeEvent::ButtonPress { window, .. }
            | NativeEvent::ButtonRelease { window, .. }
            | NativeEvent::MotionNotify { window, .. }
            | NativeEvent::EnterNotify { window, .. }
            | NativeEvent::LeaveNotify { window, .. } => *window,
            NativeEvent::MapNotify { event, .. }
            | NativeEvent::UnmapNotify { event, .. }
            | NativeEvent::ReparentNotify { event, .. }
            | NativeEvent::DestroyNotify { event, .. } => *event,
            NativeEvent::Posted(_) => NativeHandle::NONE,
        }
    }

    pub fn is_expose(&self) -> bool {
        matches!(self, NativeEvent::Expose { .. })
    }
}
