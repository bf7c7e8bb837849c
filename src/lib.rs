/// x11hwnd - native X11 window handles behind a Win32-style message pump
///
/// Each `NativeWindow` owns a frame/client pair of X11 windows and keeps its
/// window manager hints in sync. Native events are routed to a per-thread
/// `ThreadQueue`, where a `MessagePump` merges them with pending paints and
/// timers into window messages.

pub mod backend;
pub mod error;
pub mod protocol;
pub mod pump;
pub mod queue;
pub mod window;

pub use backend::{DisplayConnection, NullDisplay};
pub use error::{CreateStage, Error, Result};
pub use protocol::{Atom, NativeEvent, NativeHandle, Rect};
pub use pump::{EventReader, MessagePump};
pub use queue::{QueueRegistry, ThreadQueue, Timer};
pub use window::{
    CreateParams, Message, Msg, NativeWindow, WindowId, WindowProc, WindowRegistry,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
