//! Pending paint bookkeeping
//!
//! A window's paint flags and invalid rectangles live in their own
//! reference-counted cell, shared between the window and its thread queue's
//! paint list. The queue reads the flags while holding its own lock, so the
//! paint lock is always taken after the queue lock, never before.

use super::WindowId;
use crate::protocol::{NativeEvent, NativeHandle, Rect};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct PaintInner {
    frame: NativeHandle,
    client: NativeHandle,
    expose_pending: bool,
    nc_expose_pending: bool,
    invalid: Rect,
    nc_invalid: Rect,
}

#[derive(Debug)]
pub struct PaintState {
    window: WindowId,
    inner: Mutex<PaintInner>,
}

impl PaintState {
    pub fn new(window: WindowId) -> Self {
        PaintState {
            window,
            inner: Mutex::new(PaintInner::default()),
        }
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    pub(crate) fn set_handles(&self, frame: NativeHandle, client: NativeHandle) {
        let mut inner = self.inner.lock().unwrap();
        inner.frame = frame;
        inner.client = client;
    }

    pub fn expose_pending(&self) -> bool {
        self.inner.lock().unwrap().expose_pending
    }

    pub fn nc_expose_pending(&self) -> bool {
        self.inner.lock().unwrap().nc_expose_pending
    }

    /// True while either kind of paint is outstanding
    pub fn any_pending(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.expose_pending || inner.nc_expose_pending
    }

    /// True when both kinds of paint are outstanding
    pub fn both_pending(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.expose_pending && inner.nc_expose_pending
    }

    pub fn invalid(&self, client: bool) -> Rect {
        let inner = self.inner.lock().unwrap();
        if client {
            inner.invalid
        } else {
            inner.nc_invalid
        }
    }

    /// Accumulate `area` into the client or non-client invalid rectangle and
    /// raise the matching flag.
    ///
    /// Returns true when the window must be added to the paint list: that is
    /// only the case when no paint of either kind was outstanding before.
    pub(crate) fn add_invalid(&self, client: bool, area: Rect) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let was_pending = inner.expose_pending || inner.nc_expose_pending;
        // A rectangle left behind by a delivered paint starts over
        if client {
            inner.invalid = if inner.expose_pending {
                inner.invalid.union(&area)
            } else {
                area
            };
            inner.expose_pending = true;
        } else {
            inner.nc_invalid = if inner.nc_expose_pending {
                inner.nc_invalid.union(&area)
            } else {
                area
            };
            inner.nc_expose_pending = true;
        }
        !was_pending
    }

    /// The paint was handed to the window procedure directly: drop the
    /// obligation but keep the rectangle for `begin_paint`
    pub(crate) fn mark_delivered(&self, client: bool) {
        let mut inner = self.inner.lock().unwrap();
        if client {
            inner.expose_pending = false;
        } else {
            inner.nc_expose_pending = false;
        }
    }

    /// Clear one kind of paint and return what had accumulated for it
    pub(crate) fn take(&self, client: bool) -> Rect {
        let mut inner = self.inner.lock().unwrap();
        if client {
            inner.expose_pending = false;
            std::mem::replace(&mut inner.invalid, Rect::EMPTY)
        } else {
            inner.nc_expose_pending = false;
            std::mem::replace(&mut inner.nc_invalid, Rect::EMPTY)
        }
    }

    /// Drop every outstanding paint
    pub(crate) fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.expose_pending = false;
        inner.nc_expose_pending = false;
        inner.invalid = Rect::EMPTY;
        inner.nc_invalid = Rect::EMPTY;
    }

    /// The exposure record the paint list hands out for this window: the
    /// client paint (whole client, no region) first, then the non-client
    /// paint of the frame with its accumulated rectangle.
    pub fn expose_event(&self) -> NativeEvent {
        self.next_expose().0
    }

    /// `expose_event` plus whether both kinds were pending, read under one
    /// lock so the paint list decides on the flags it handed out
    pub(crate) fn next_expose(&self) -> (NativeEvent, bool) {
        let inner = self.inner.lock().unwrap();
        let both = inner.expose_pending && inner.nc_expose_pending;
        let event = if inner.expose_pending {
            NativeEvent::Expose {
                window: inner.client,
                area: None,
            }
        } else {
            NativeEvent::Expose {
                window: inner.frame,
                area: Some(inner.nc_invalid),
            }
        };
        (event, both)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> PaintState {
        let paint = PaintState::new(WindowId(1));
        paint.set_handles(NativeHandle(10), NativeHandle(11));
        paint
    }

    #[test]
    fn test_only_first_invalidation_requests_enqueue() {
        let paint = state();
        assert!(paint.add_invalid(true, Rect::new(0, 0, 10, 10)));
        assert!(!paint.add_invalid(true, Rect::new(5, 5, 10, 10)));
        assert!(!paint.add_invalid(false, Rect::new(0, 0, 1, 1)));
        assert_eq!(paint.invalid(true), Rect::new(0, 0, 15, 15));
    }

    #[test]
    fn test_client_paint_is_offered_first() {
        let paint = state();
        paint.add_invalid(false, Rect::new(0, 0, 4, 4));
        paint.add_invalid(true, Rect::new(1, 1, 2, 2));
        assert_eq!(
            paint.expose_event(),
            NativeEvent::Expose {
                window: NativeHandle(11),
                area: None
            }
        );
        paint.take(true);
        assert_eq!(
            paint.expose_event(),
            NativeEvent::Expose {
                window: NativeHandle(10),
                area: Some(Rect::new(0, 0, 4, 4))
            }
        );
    }

    #[test]
    fn test_take_clears_flag_and_region() {
        let paint = state();
        paint.add_invalid(true, Rect::new(0, 0, 3, 3));
        assert_eq!(paint.take(true), Rect::new(0, 0, 3, 3));
        assert!(!paint.any_pending());
        assert!(paint.invalid(true).is_empty());
    }
}
