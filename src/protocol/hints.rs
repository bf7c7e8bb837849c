//! Window manager hint structures and property encodings
//!
//! Everything here is bit-exact with what window managers read: Motif hints
//! are five CARD32s, `WM_NORMAL_HINTS` eighteen, `WM_HINTS` nine. Format-32
//! properties are stored in the client's native byte order, the same way
//! Xlib hands them to the server.

use super::types::{Atom, NativeHandle};
use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

/// Raw property value: type atom, element format (8, 16 or 32) and data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValue {
    pub type_: Atom,
    pub format: u8,
    pub data: Vec<u8>,
}

impl PropertyValue {
    /// Format-32 property from a list of CARD32 values
    pub fn from_u32s(type_: Atom, values: &[u32]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 4);
        for v in values {
            // Writing into a Vec cannot fail
            let _ = data.write_u32::<NativeEndian>(*v);
        }
        PropertyValue {
            type_,
            format: 32,
            data,
        }
    }

    pub fn from_atoms(atoms: &[Atom]) -> Self {
        let raw: Vec<u32> = atoms.iter().map(|a| a.get()).collect();
        Self::from_u32s(Atom::ATOM, &raw)
    }

    /// Format-8 property holding raw bytes
    pub fn from_bytes(type_: Atom, bytes: &[u8]) -> Self {
        PropertyValue {
            type_,
            format: 8,
            data: bytes.to_vec(),
        }
    }

    /// Number of elements (not bytes)
    pub fn len(&self) -> usize {
        match self.format {
            32 => self.data.len() / 4,
            16 => self.data.len() / 2,
            _ => self.data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode a format-32 property; other formats decode to nothing.
    pub fn to_u32s(&self) -> Vec<u32> {
        if self.format != 32 {
            return Vec::new();
        }
        let mut cursor = Cursor::new(&self.data);
        let mut out = Vec::with_capacity(self.len());
        while let Ok(v) = cursor.read_u32::<NativeEndian>() {
            out.push(v);
        }
        out
    }

    pub fn to_atoms(&self) -> Vec<Atom> {
        self.to_u32s().into_iter().map(Atom).collect()
    }
}

/// Motif `_MOTIF_WM_HINTS` flags
pub mod motif {
    pub const FLAG_FUNCTIONS: u32 = 1 << 0;
    pub const FLAG_DECORATIONS: u32 = 1 << 1;

    pub const FUNC_ALL: u32 = 1 << 0;
    pub const FUNC_RESIZE: u32 = 1 << 1;
    pub const FUNC_MOVE: u32 = 1 << 2;
    pub const FUNC_MINIMIZE: u32 = 1 << 3;
    pub const FUNC_MAXIMIZE: u32 = 1 << 4;
    pub const FUNC_CLOSE: u32 = 1 << 5;

    pub const DECOR_ALL: u32 = 1 << 0;
    pub const DECOR_BORDER: u32 = 1 << 1;
    pub const DECOR_RESIZEH: u32 = 1 << 2;
    pub const DECOR_TITLE: u32 = 1 << 3;
    pub const DECOR_MENU: u32 = 1 << 4;
    pub const DECOR_MINIMIZE: u32 = 1 << 5;
    pub const DECOR_MAXIMIZE: u32 = 1 << 6;
}

/// Vendor decoration/function hint structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotifWmHints {
    pub flags: u32,
    pub functions: u32,
    pub decorations: u32,
    pub input_mode: u32,
    pub status: u32,
}

impl MotifWmHints {
    pub fn new(functions: u32, decorations: u32) -> Self {
        MotifWmHints {
            flags: motif::FLAG_FUNCTIONS | motif::FLAG_DECORATIONS,
            functions,
            decorations,
            input_mode: 0,
            status: 0,
        }
    }

    pub fn to_property(&self, type_: Atom) -> PropertyValue {
        PropertyValue::from_u32s(
            type_,
            &[
                self.flags,
                self.functions,
                self.decorations,
                self.input_mode,
                self.status,
            ],
        )
    }
}

/// `WM_NORMAL_HINTS` flags
pub mod size_hints {
    pub const US_POSITION: u32 = 1 << 0;
    pub const US_SIZE: u32 = 1 << 1;
    pub const P_POSITION: u32 = 1 << 2;
    pub const P_SIZE: u32 = 1 << 3;
    pub const P_MIN_SIZE: u32 = 1 << 4;
    pub const P_MAX_SIZE: u32 = 1 << 5;
    pub const P_RESIZE_INC: u32 = 1 << 6;
    pub const P_ASPECT: u32 = 1 << 7;
    pub const P_BASE_SIZE: u32 = 1 << 8;
    pub const P_WIN_GRAVITY: u32 = 1 << 9;
}

/// ICCCM size hints (`WM_NORMAL_HINTS` / `WM_ZOOM_HINTS`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeHints {
    pub flags: u32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub width_inc: i32,
    pub height_inc: i32,
    pub min_aspect: (i32, i32),
    pub max_aspect: (i32, i32),
    pub base_width: i32,
    pub base_height: i32,
    pub win_gravity: i32,
}

impl SizeHints {
    pub const ELEMENTS: usize = 18;

    pub fn to_property(&self) -> PropertyValue {
        let v = [
            self.flags,
            self.x as u32,
            self.y as u32,
            self.width as u32,
            self.height as u32,
            self.min_width as u32,
            self.min_height as u32,
            self.max_width as u32,
            self.max_height as u32,
            self.width_inc as u32,
            self.height_inc as u32,
            self.min_aspect.0 as u32,
            self.min_aspect.1 as u32,
            self.max_aspect.0 as u32,
            self.max_aspect.1 as u32,
            self.base_width as u32,
            self.base_height as u32,
            self.win_gravity as u32,
        ];
        PropertyValue::from_u32s(Atom::WM_SIZE_HINTS, &v)
    }

    /// Decode a size hints property. Short (pre-ICCCM) properties are padded
    /// with zeroes.
    pub fn from_property(value: &PropertyValue) -> SizeHints {
        let mut v = value.to_u32s();
        v.resize(Self::ELEMENTS, 0);
        SizeHints {
            flags: v[0],
            x: v[1] as i32,
            y: v[2] as i32,
            width: v[3] as i32,
            height: v[4] as i32,
            min_width: v[5] as i32,
            min_height: v[6] as i32,
            max_width: v[7] as i32,
            max_height: v[8] as i32,
            width_inc: v[9] as i32,
            height_inc: v[10] as i32,
            min_aspect: (v[11] as i32, v[12] as i32),
            max_aspect: (v[13] as i32, v[14] as i32),
            base_width: v[15] as i32,
            base_height: v[16] as i32,
            win_gravity: v[17] as i32,
        }
    }
}

/// `WM_HINTS` flags and states
pub mod wm_hints {
    pub const INPUT: u32 = 1 << 0;
    pub const STATE: u32 = 1 << 1;
    pub const ICON_PIXMAP: u32 = 1 << 2;
    pub const ICON_WINDOW: u32 = 1 << 3;
    pub const ICON_POSITION: u32 = 1 << 4;
    pub const ICON_MASK: u32 = 1 << 5;
    pub const WINDOW_GROUP: u32 = 1 << 6;

    pub const NORMAL_STATE: u32 = 1;
    pub const ICONIC_STATE: u32 = 3;
}

/// ICCCM `WM_HINTS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WmHints {
    pub flags: u32,
    pub input: bool,
    pub initial_state: u32,
    pub icon_pixmap: u32,
    pub icon_window: NativeHandle,
    pub icon_x: i32,
    pub icon_y: i32,
    pub icon_mask: u32,
    pub window_group: NativeHandle,
}

impl WmHints {
    pub fn to_property(&self) -> PropertyValue {
        let v = [
            self.flags,
            self.input as u32,
            self.initial_state,
            self.icon_pixmap,
            self.icon_window.get(),
            self.icon_x as u32,
            self.icon_y as u32,
            self.icon_mask,
            self.window_group.get(),
        ];
        PropertyValue::from_u32s(Atom::WM_HINTS, &v)
    }
}

/// ARGB icon image for `_NET_WM_ICON`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub width: u32,
    pub height: u32,
    /// Row-major 0xAARRGGBB pixels, `width * height` of them
    pub argb: Vec<u32>,
}

impl Icon {
    pub fn to_cardinals(&self) -> Vec<u32> {
        let mut data = Vec::with_capacity(self.argb.len() + 2);
        data.push(self.width);
        data.push(self.height);
        data.extend_from_slice(&self.argb);
        data
    }
}

/// Scale an opacity in `[0, 1]` to the 32-bit `_NET_WM_WINDOW_OPACITY` value
pub fn opacity_to_cardinal(opacity: f64) -> u32 {
    (opacity.clamp(0.0, 1.0) * u32::MAX as f64) as u32
}
