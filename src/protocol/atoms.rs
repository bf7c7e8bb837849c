//! Window manager protocol atoms
//!
//! The set of ICCCM / EWMH / Motif atoms the window core exchanges with the
//! window manager. They are interned once per display connection.

use super::types::Atom;
use std::error::Error;

/// Names in interning order. `Atoms::intern` relies on this order.
pub const ATOM_NAMES: &[&str] = &[
    "WM_PROTOCOLS",
    "WM_DELETE_WINDOW",
    "WM_TAKE_FOCUS",
    "UTF8_STRING",
    "_MOTIF_WM_HINTS",
    "_NET_WM_NAME",
    "_NET_WM_ICON",
    "_NET_WM_WINDOW_OPACITY",
    "_NET_FRAME_EXTENTS",
    "_NET_ACTIVE_WINDOW",
    "_NET_WM_CONTEXT_HELP",
    "_NET_WM_STATE",
    "_NET_WM_STATE_MAXIMIZED_HORZ",
    "_NET_WM_STATE_MAXIMIZED_VERT",
    "_NET_WM_STATE_HIDDEN",
    "_NET_WM_STATE_SKIP_TASKBAR",
    "_NET_WM_STATE_ABOVE",
    "_NET_WM_STATE_MODAL",
    "_NET_WM_WINDOW_TYPE",
    "_NET_WM_WINDOW_TYPE_NORMAL",
    "_NET_WM_WINDOW_TYPE_UTILITY",
    "_NET_WM_WINDOW_TYPE_DIALOG",
    "WM_CHANGE_STATE",
];

/// `_NET_WM_STATE` client message actions
pub const NET_WM_STATE_REMOVE: u32 = 0;
pub const NET_WM_STATE_ADD: u32 = 1;
pub const NET_WM_STATE_TOGGLE: u32 = 2;

/// Interned protocol atoms
#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Atoms {
    pub WM_PROTOCOLS: Atom,
    pub WM_DELETE_WINDOW: Atom,
    pub WM_TAKE_FOCUS: Atom,
    pub UTF8_STRING: Atom,
    pub _MOTIF_WM_HINTS: Atom,
    pub _NET_WM_NAME: Atom,
    pub _NET_WM_ICON: Atom,
    pub _NET_WM_WINDOW_OPACITY: Atom,
    pub _NET_FRAME_EXTENTS: Atom,
    pub _NET_ACTIVE_WINDOW: Atom,
    pub _NET_WM_CONTEXT_HELP: Atom,
    pub _NET_WM_STATE: Atom,
    pub _NET_WM_STATE_MAXIMIZED_HORZ: Atom,
    pub _NET_WM_STATE_MAXIMIZED_VERT: Atom,
    pub _NET_WM_STATE_HIDDEN: Atom,
    pub _NET_WM_STATE_SKIP_TASKBAR: Atom,
    pub _NET_WM_STATE_ABOVE: Atom,
    pub _NET_WM_STATE_MODAL: Atom,
    pub _NET_WM_WINDOW_TYPE: Atom,
    pub _NET_WM_WINDOW_TYPE_NORMAL: Atom,
    pub _NET_WM_WINDOW_TYPE_UTILITY: Atom,
    pub _NET_WM_WINDOW_TYPE_DIALOG: Atom,
    pub WM_CHANGE_STATE: Atom,
}

impl Atoms {
    /// Intern every atom in `ATOM_NAMES` through `intern`.
    pub fn intern<F>(mut intern: F) -> Result<Atoms, Box<dyn Error + Send + Sync>>
    where
        F: FnMut(&str) -> Result<Atom, Box<dyn Error + Send + Sync>>,
    {
        let mut values = Vec::with_capacity(ATOM_NAMES.len());
        for name in ATOM_NAMES {
            values.push(intern(name)?);
        }
        Ok(Atoms::from_slice(&values))
    }

    fn from_slice(v: &[Atom]) -> Atoms {
        Atoms {
            WM_PROTOCOLS: v[0],
            WM_DELETE_WINDOW: v[1],
            WM_TAKE_FOCUS: v[2],
            UTF8_STRING: v[3],
            _MOTIF_WM_HINTS: v[4],
            _NET_WM_NAME: v[5],
            _NET_WM_ICON: v[6],
            _NET_WM_WINDOW_OPACITY: v[7],
            _NET_FRAME_EXTENTS: v[8],
            _NET_ACTIVE_WINDOW: v[9],
            _NET_WM_CONTEXT_HELP: v[10],
            _NET_WM_STATE: v[11],
            _NET_WM_STATE_MAXIMIZED_HORZ: v[12],
            _NET_WM_STATE_MAXIMIZED_VERT: v[13],
            _NET_WM_STATE_HIDDEN: v[14],
            _NET_WM_STATE_SKIP_TASKBAR: v[15],
            _NET_WM_STATE_ABOVE: v[16],
            _NET_WM_STATE_MODAL: v[17],
            _NET_WM_WINDOW_TYPE: v[18],
            _NET_WM_WINDOW_TYPE_NORMAL: v[19],
            _NET_WM_WINDOW_TYPE_UTILITY: v[20],
            _NET_WM_WINDOW_TYPE_DIALOG: v[21],
            WM_CHANGE_STATE: v[22],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_assigns_in_name_order() {
        let mut next = 100;
        let atoms = Atoms::intern(|_| {
            next += 1;
            Ok(Atom(next))
        })
        .unwrap();
        assert_eq!(atoms.WM_PROTOCOLS, Atom(101));
        assert_eq!(atoms.WM_CHANGE_STATE, Atom(100 + ATOM_NAMES.len() as u32));
    }

    #[test]
    fn test_intern_propagates_failure() {
        let result = Atoms::intern(|name| {
            if name == "_NET_WM_STATE" {
                Err("no atom".into())
            } else {
                Ok(Atom(1))
            }
        });
        assert!(result.is_err());
    }
}
