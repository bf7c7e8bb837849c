//! Window messages and the window procedure sink

use super::WindowId;
use std::fmt;

/// Window message code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Msg(pub u32);

impl Msg {
    pub const NULL: Msg = Msg(0x0000);
    pub const CREATE: Msg = Msg(0x0001);
    pub const DESTROY: Msg = Msg(0x0002);
    pub const SETFOCUS: Msg = Msg(0x0007);
    pub const KILLFOCUS: Msg = Msg(0x0008);
    pub const PAINT: Msg = Msg(0x000F);
    pub const CLOSE: Msg = Msg(0x0010);
    pub const QUIT: Msg = Msg(0x0012);
    pub const SHOWWINDOW: Msg = Msg(0x0018);
    pub const WINDOWPOSCHANGED: Msg = Msg(0x0047);
    pub const HELP: Msg = Msg(0x0053);
    pub const NCPAINT: Msg = Msg(0x0085);
    pub const KEYDOWN: Msg = Msg(0x0100);
    pub const KEYUP: Msg = Msg(0x0101);
    pub const TIMER: Msg = Msg(0x0113);
    pub const ENTERIDLE: Msg = Msg(0x0121);
    pub const MOUSEMOVE: Msg = Msg(0x0200);
    pub const LBUTTONDOWN: Msg = Msg(0x0201);
    pub const LBUTTONUP: Msg = Msg(0x0202);
    pub const RBUTTONDOWN: Msg = Msg(0x0204);
    pub const RBUTTONUP: Msg = Msg(0x0205);
    pub const MBUTTONDOWN: Msg = Msg(0x0207);
    pub const MBUTTONUP: Msg = Msg(0x0208);
    pub const MOUSEWHEEL: Msg = Msg(0x020A);
    pub const MOUSELEAVE: Msg = Msg(0x02A3);
    /// First code free for application use
    pub const USER: Msg = Msg(0x0400);

    /// Name of a known message, for logging
    pub fn name(&self) -> Option<&'static str> {
        Some(match *self {
            Msg::NULL => "WM_NULL",
            Msg::CREATE => "WM_CREATE",
            Msg::DESTROY => "WM_DESTROY",
            Msg::SETFOCUS => "WM_SETFOCUS",
            Msg::KILLFOCUS => "WM_KILLFOCUS",
            Msg::PAINT => "WM_PAINT",
            Msg::CLOSE => "WM_CLOSE",
            Msg::QUIT => "WM_QUIT",
            Msg::SHOWWINDOW => "WM_SHOWWINDOW",
            Msg::WINDOWPOSCHANGED => "WM_WINDOWPOSCHANGED",
            Msg::HELP => "WM_HELP",
            Msg::NCPAINT => "WM_NCPAINT",
            Msg::KEYDOWN => "WM_KEYDOWN",
            Msg::KEYUP => "WM_KEYUP",
            Msg::TIMER => "WM_TIMER",
            Msg::ENTERIDLE => "WM_ENTERIDLE",
            Msg::MOUSEMOVE => "WM_MOUSEMOVE",
            Msg::LBUTTONDOWN => "WM_LBUTTONDOWN",
            Msg::LBUTTONUP => "WM_LBUTTONUP",
            Msg::RBUTTONDOWN => "WM_RBUTTONDOWN",
            Msg::RBUTTONUP => "WM_RBUTTONUP",
            Msg::MBUTTONDOWN => "WM_MBUTTONDOWN",
            Msg::MBUTTONUP => "WM_MBUTTONUP",
            Msg::MOUSEWHEEL => "WM_MOUSEWHEEL",
            Msg::MOUSELEAVE => "WM_MOUSELEAVE",
            _ => return None,
        })
    }
}

impl fmt::Display for Msg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "0x{:04x}", self.0),
        }
    }
}

/// A message addressed to a window procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub window: WindowId,
    pub msg: Msg,
    pub wparam: usize,
    pub lparam: isize,
}

impl Message {
    pub fn new(window: WindowId, msg: Msg, wparam: usize, lparam: isize) -> Self {
        Message {
            window,
            msg,
            wparam,
            lparam,
        }
    }
}

/// Pack a point the way mouse messages carry it
pub fn make_lparam(x: i32, y: i32) -> isize {
    (((y as u32 & 0xffff) << 16) | (x as u32 & 0xffff)) as i32 as isize
}

/// Receives every message delivered to windows.
///
/// Implementations run on whichever thread delivers the message and may call
/// back into the window registry.
pub trait WindowProc: Send + Sync {
    fn window_proc(&self, window: WindowId, msg: Msg, wparam: usize, lparam: isize) -> isize;
}

/// Window procedure that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWindowProc;

impl WindowProc for DefaultWindowProc {
    fn window_proc(&self, _window: WindowId, _msg: Msg, _wparam: usize, _lparam: isize) -> isize {
        0
    }
}
