//! Window style bits and the style policy
//!
//! Style and extended style words use the classic toolkit bit layout. The
//! policy turns them into frame metrics and into the decoration/function
//! hints handed to the window manager.

use crate::protocol::{motif, MotifWmHints};

pub const WS_POPUP: u32 = 0x8000_0000;
pub const WS_CHILD: u32 = 0x4000_0000;
pub const WS_MINIMIZE: u32 = 0x2000_0000;
pub const WS_VISIBLE: u32 = 0x1000_0000;
pub const WS_DISABLED: u32 = 0x0800_0000;
pub const WS_MAXIMIZE: u32 = 0x0100_0000;
pub const WS_CAPTION: u32 = 0x00C0_0000;
pub const WS_BORDER: u32 = 0x0080_0000;
pub const WS_DLGFRAME: u32 = 0x0040_0000;
pub const WS_SYSMENU: u32 = 0x0008_0000;
pub const WS_THICKFRAME: u32 = 0x0004_0000;
pub const WS_SIZEBOX: u32 = WS_THICKFRAME;
pub const WS_MINIMIZEBOX: u32 = 0x0002_0000;
pub const WS_MAXIMIZEBOX: u32 = 0x0001_0000;

pub const WS_EX_DLGMODALFRAME: u32 = 0x0000_0001;
pub const WS_EX_TOPMOST: u32 = 0x0000_0008;
pub const WS_EX_TOOLWINDOW: u32 = 0x0000_0080;
pub const WS_EX_CLIENTEDGE: u32 = 0x0000_0200;
pub const WS_EX_CONTEXTHELP: u32 = 0x0000_0400;
pub const WS_EX_STATICEDGE: u32 = 0x0002_0000;
pub const WS_EX_APPWINDOW: u32 = 0x0004_0000;

/// Height of a drawn caption
pub const CAPTION_HEIGHT: i32 = 19;
/// Height of a drawn tool window caption
pub const TOOL_CAPTION_HEIGHT: i32 = 16;

#[inline]
pub fn style_set(style: u32, bits: u32) -> bool {
    style & bits == bits
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderStyle {
    #[default]
    None,
    FixedSingle,
    Fixed3D,
}

impl BorderStyle {
    pub fn width(&self) -> i32 {
        match self {
            BorderStyle::None => 0,
            BorderStyle::FixedSingle => 1,
            BorderStyle::Fixed3D => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TitleStyle {
    #[default]
    None,
    Normal,
    Tool,
}

/// Non-client metrics the window draws itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DerivedStyles {
    pub border_style: BorderStyle,
    pub border_static: bool,
    pub title_style: TitleStyle,
    pub caption_height: i32,
}

/// Window manager hints derived from a style pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WmStyleHints {
    pub motif: MotifWmHints,
    /// The window manager must not let the user resize the window
    pub fixed_size: bool,
}

/// Maps style words to frame metrics and window manager hints.
///
/// The window core treats this as a black box; replace it to change how
/// decorations are requested without touching window management.
pub trait StylePolicy: Send + Sync {
    fn derive(&self, style: u32, ex_style: u32) -> DerivedStyles;

    fn wm_hints(&self, style: u32, ex_style: u32, caption: &str) -> WmStyleHints;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStylePolicy;

impl StylePolicy for DefaultStylePolicy {
    fn derive(&self, style: u32, ex_style: u32) -> DerivedStyles {
        let mut derived = DerivedStyles {
            border_static: style_set(ex_style, WS_EX_STATICEDGE),
            ..Default::default()
        };

        if style_set(style, WS_CHILD) {
            // Children draw their own border; the window manager never sees them
            derived.border_style = if !style_set(style, WS_BORDER) {
                BorderStyle::None
            } else if style_set(ex_style, WS_EX_CLIENTEDGE) {
                BorderStyle::Fixed3D
            } else {
                BorderStyle::FixedSingle
            };
        } else if style_set(style, WS_CAPTION) {
            // Top-level decorations are drawn by the window manager
            derived.title_style = if style_set(ex_style, WS_EX_TOOLWINDOW) {
                TitleStyle::Tool
            } else {
                TitleStyle::Normal
            };
        }
        derived
    }

    fn wm_hints(&self, style: u32, ex_style: u32, caption: &str) -> WmStyleHints {
        let mut functions = 0;
        let mut decorations = 0;

        if style_set(ex_style, WS_EX_TOOLWINDOW) {
            // No decorations, but keep the functions: some window managers
            // ignore maximize requests for windows without them
            functions |= motif::FUNC_MOVE
                | motif::FUNC_RESIZE
                | motif::FUNC_MINIMIZE
                | motif::FUNC_MAXIMIZE;
        } else {
            if style_set(style, WS_CAPTION) {
                functions |= motif::FUNC_MOVE;
                decorations |= motif::DECOR_TITLE | motif::DECOR_MENU;
            }
            if style_set(style, WS_THICKFRAME) {
                functions |= motif::FUNC_MOVE | motif::FUNC_RESIZE;
                decorations |= motif::DECOR_BORDER | motif::DECOR_RESIZEH;
            }
            if style_set(style, WS_MINIMIZEBOX) {
                functions |= motif::FUNC_MINIMIZE;
                decorations |= motif::DECOR_MINIMIZE;
            }
            if style_set(style, WS_MAXIMIZEBOX) {
                functions |= motif::FUNC_MAXIMIZE;
                decorations |= motif::DECOR_MAXIMIZE;
            }
            if style_set(style, WS_SIZEBOX) {
                functions |= motif::FUNC_RESIZE;
                decorations |= motif::DECOR_RESIZEH;
            }
            if style_set(ex_style, WS_EX_DLGMODALFRAME)
                || style_set(style, WS_BORDER)
                || style_set(style, WS_DLGFRAME)
            {
                decorations |= motif::DECOR_BORDER;
            }

            if style_set(style, WS_SYSMENU) {
                functions |= motif::FUNC_CLOSE;
            } else {
                functions &= !(motif::FUNC_MAXIMIZE | motif::FUNC_MINIMIZE | motif::FUNC_CLOSE);
                decorations &=
                    !(motif::DECOR_MENU | motif::DECOR_MAXIMIZE | motif::DECOR_MINIMIZE);
                if caption.is_empty() {
                    functions &= !motif::FUNC_MOVE;
                    decorations &= !(motif::DECOR_TITLE | motif::DECOR_RESIZEH);
                }
            }
        }

        WmStyleHints {
            motif: MotifWmHints::new(functions, decorations),
            fixed_size: functions & motif::FUNC_RESIZE == 0,
        }
    }
}
