//! X11 Backend - Display connection to a real X server
//!
//! Built on x11rb's pure-Rust connection. Requests are forwarded one to one;
//! replies are waited for only where the window core needs a value back.
//! x11rb always speaks the client's native byte order, which is also the
//! order `PropertyValue` stores format-32 data in, so property payloads are
//! passed through untouched.

use super::*;
use crate::protocol::*;
use std::thread;
use std::time::{Duration, Instant};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::protocol::Event as XEvent;
use x11rb::rust_connection::RustConnection;

/// How long `poll_event` sleeps between polls of the connection
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Saturate a coordinate to the 16-bit wire range
fn to_i16(v: i32) -> i16 {
    v.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

fn to_u16(v: u32) -> u16 {
    v.min(u16::MAX as u32) as u16
}

pub struct X11Display {
    conn: RustConnection,
    root: NativeHandle,
    root_visual: xproto::Visualid,
    foster: NativeHandle,
    atoms: Atoms,
}

impl X11Display {
    /// Connect to `display`, or to `$DISPLAY` when `None`
    pub fn connect(display: Option<&str>) -> BackendResult<Self> {
        let (conn, screen_num) = x11rb::connect(display)?;
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let root_visual = screen.root_visual;

        log::debug!(
            "X11 display connected: screen {} root 0x{:x} ({}x{})",
            screen_num,
            root,
            screen.width_in_pixels,
            screen.height_in_pixels
        );

        let atoms = Atoms::intern(|name| {
            let reply = conn.intern_atom(false, name.as_bytes())?.reply()?;
            Ok(Atom(reply.atom))
        })?;

        // Hidden placeholder parent for child windows created before their
        // parent is known
        let foster = conn.generate_id()?;
        conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            foster,
            root,
            0,
            0,
            1,
            1,
            0,
            xproto::WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &xproto::CreateWindowAux::new().override_redirect(1),
        )?;
        conn.flush()?;

        Ok(X11Display {
            conn,
            root: NativeHandle(root),
            root_visual,
            foster: NativeHandle(foster),
            atoms,
        })
    }

    fn translate_event(&self, event: XEvent) -> Option<NativeEvent> {
        let native = match event {
            XEvent::Expose(e) => NativeEvent::Expose {
                window: NativeHandle(e.window),
                area: Some(Rect::new(
                    e.x as i32,
                    e.y as i32,
                    e.width as i32,
                    e.height as i32,
                )),
            },
            XEvent::ConfigureNotify(e) => NativeEvent::Configure {
                window: NativeHandle(e.window),
                x: e.x as i32,
                y: e.y as i32,
                width: e.width as i32,
                height: e.height as i32,
                synthetic: e.response_type & 0x80 != 0,
            },
            XEvent::MapNotify(e) => NativeEvent::MapNotify {
                event: NativeHandle(e.event),
                window: NativeHandle(e.window),
            },
            XEvent::UnmapNotify(e) => NativeEvent::UnmapNotify {
                event: NativeHandle(e.event),
                window: NativeHandle(e.window),
            },
            XEvent::ReparentNotify(e) => NativeEvent::ReparentNotify {
                event: NativeHandle(e.event),
                window: NativeHandle(e.window),
                parent: NativeHandle(e.parent),
            },
            XEvent::DestroyNotify(e) => NativeEvent::DestroyNotify {
                event: NativeHandle(e.event),
                window: NativeHandle(e.window),
            },
            XEvent::PropertyNotify(e) => NativeEvent::PropertyNotify {
                window: NativeHandle(e.window),
                atom: Atom(e.atom),
                deleted: e.state == xproto::Property::DELETE,
            },
            XEvent::ClientMessage(e) => NativeEvent::ClientMessage {
                window: NativeHandle(e.window),
                type_: Atom(e.type_),
                data: e.data.as_data32(),
            },
            XEvent::FocusIn(e) => NativeEvent::FocusIn {
                window: NativeHandle(e.event),
                detail: focus_detail(e.detail),
            },
            XEvent::FocusOut(e) => NativeEvent::FocusOut {
                window: NativeHandle(e.event),
                detail: focus_detail(e.detail),
            },
            XEvent::KeyPress(e) => NativeEvent::KeyPress {
                window: NativeHandle(e.event),
                keycode: e.detail,
                state: u16::from(e.state),
                time: e.time,
            },
            XEvent::KeyRelease(e) => NativeEvent::KeyRelease {
                window: NativeHandle(e.event),
                keycode: e.detail,
                state: u16::from(e.state),
                time: e.time,
            },
            XEvent::ButtonPress(e) => NativeEvent::ButtonPress {
                window: NativeHandle(e.event),
                button: e.detail,
                state: u16::from(e.state),
                time: e.time,
                x: e.event_x as i32,
                y: e.event_y as i32,
            },
            XEvent::ButtonRelease(e) => NativeEvent::ButtonRelease {
                window: NativeHandle(e.event),
                button: e.detail,
                state: u16::from(e.state),
                time: e.time,
                x: e.event_x as i32,
                y: e.event_y as i32,
            },
            XEvent::MotionNotify(e) => NativeEvent::MotionNotify {
                window: NativeHandle(e.event),
                state: u16::from(e.state),
                time: e.time,
                x: e.event_x as i32,
                y: e.event_y as i32,
            },
            XEvent::EnterNotify(e) => NativeEvent::EnterNotify {
                window: NativeHandle(e.event),
                x: e.event_x as i32,
                y: e.event_y as i32,
            },
            XEvent::LeaveNotify(e) => NativeEvent::LeaveNotify {
                window: NativeHandle(e.event),
                x: e.event_x as i32,
                y: e.event_y as i32,
            },
            XEvent::Error(e) => {
                log::warn!("X11 error: {:?}", e);
                return None;
            }
            other => {
                log::trace!("X11 event ignored: {:?}", other);
                return None;
            }
        };
        Some(native)
    }
}

fn focus_detail(detail: xproto::NotifyDetail) -> FocusDetail {
    if detail == xproto::NotifyDetail::NONLINEAR {
        FocusDetail::Nonlinear
    } else {
        FocusDetail::Other
    }
}

impl DisplayConnection for X11Display {
    fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    fn root_window(&self) -> NativeHandle {
        self.root
    }

    fn foster_parent(&self) -> NativeHandle {
        self.foster
    }

    fn intern_atom(&self, name: &str) -> BackendResult<Atom> {
        let reply = self.conn.intern_atom(false, name.as_bytes())?.reply()?;
        Ok(Atom(reply.atom))
    }

    fn create_window(&self, params: &NativeWindowParams) -> BackendResult<NativeHandle> {
        let id = self.conn.generate_id()?;
        let mut aux = xproto::CreateWindowAux::new();
        if params.gravity_north_west {
            aux = aux
                .bit_gravity(xproto::Gravity::NORTH_WEST)
                .win_gravity(xproto::Gravity::NORTH_WEST);
        }
        if params.save_under {
            aux = aux.save_under(1);
        }
        if params.override_redirect {
            aux = aux.override_redirect(1);
        }

        let cookie = self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            id,
            params.parent.get(),
            to_i16(params.x),
            to_i16(params.y),
            to_u16(params.width),
            to_u16(params.height),
            0,
            xproto::WindowClass::INPUT_OUTPUT,
            if params.custom_visual {
                self.root_visual
            } else {
                x11rb::COPY_FROM_PARENT
            },
            &aux,
        )?;

        // A refused creation is reported as a null handle
        if let Err(e) = cookie.check() {
            log::warn!("X11 create_window failed: {}", e);
            return Ok(NativeHandle::NONE);
        }
        Ok(NativeHandle(id))
    }

    fn destroy_window(&self, window: NativeHandle) -> BackendResult<()> {
        self.conn.destroy_window(window.get())?;
        Ok(())
    }

    fn map_window(&self, window: NativeHandle) -> BackendResult<()> {
        self.conn.map_window(window.get())?;
        Ok(())
    }

    fn map_raised(&self, window: NativeHandle) -> BackendResult<()> {
        self.conn.configure_window(
            window.get(),
            &xproto::ConfigureWindowAux::new().stack_mode(xproto::StackMode::ABOVE),
        )?;
        self.conn.map_window(window.get())?;
        Ok(())
    }

    fn unmap_window(&self, window: NativeHandle) -> BackendResult<()> {
        self.conn.unmap_window(window.get())?;
        Ok(())
    }

    fn configure_window(&self, window: NativeHandle, config: WindowConfig) -> BackendResult<()> {
        let mut aux = xproto::ConfigureWindowAux::new();
        if let Some(x) = config.x {
            aux = aux.x(x);
        }
        if let Some(y) = config.y {
            aux = aux.y(y);
        }
        if let Some(width) = config.width {
            aux = aux.width(width);
        }
        if let Some(height) = config.height {
            aux = aux.height(height);
        }
        self.conn.configure_window(window.get(), &aux)?;
        Ok(())
    }

    fn select_input(&self, window: NativeHandle, event_mask: u32) -> BackendResult<()> {
        let aux =
            xproto::ChangeWindowAttributesAux::new().event_mask(xproto::EventMask::from(event_mask));
        self.conn.change_window_attributes(window.get(), &aux)?;
        Ok(())
    }

    fn get_geometry(&self, window: NativeHandle) -> BackendResult<Geometry> {
        let reply = self.conn.get_geometry(window.get())?.reply()?;
        Ok(Geometry {
            root: NativeHandle(reply.root),
            x: reply.x as i32,
            y: reply.y as i32,
            width: reply.width as i32,
            height: reply.height as i32,
            border_width: reply.border_width as i32,
            depth: reply.depth,
        })
    }

    fn get_map_state(&self, window: NativeHandle) -> BackendResult<MapState> {
        let reply = self.conn.get_window_attributes(window.get())?.reply()?;
        Ok(match reply.map_state {
            xproto::MapState::VIEWABLE => MapState::Viewable,
            xproto::MapState::UNVIEWABLE => MapState::Unviewable,
            _ => MapState::Unmapped,
        })
    }

    fn query_parent(&self, window: NativeHandle) -> BackendResult<NativeHandle> {
        let reply = self.conn.query_tree(window.get())?.reply()?;
        Ok(NativeHandle(reply.parent))
    }

    fn translate_coordinates(
        &self,
        src: NativeHandle,
        dst: NativeHandle,
        x: i32,
        y: i32,
    ) -> BackendResult<(i32, i32)> {
        let reply = self
            .conn
            .translate_coordinates(src.get(), dst.get(), to_i16(x), to_i16(y))?
            .reply()?;
        Ok((reply.dst_x as i32, reply.dst_y as i32))
    }

    fn change_property(
        &self,
        window: NativeHandle,
        property: Atom,
        value: &PropertyValue,
    ) -> BackendResult<()> {
        self.conn.change_property(
            xproto::PropMode::REPLACE,
            window.get(),
            property.get(),
            value.type_.get(),
            value.format,
            value.len() as u32,
            &value.data,
        )?;
        Ok(())
    }

    fn get_property(
        &self,
        window: NativeHandle,
        property: Atom,
        type_: Atom,
    ) -> BackendResult<Option<PropertyValue>> {
        let type_ = if type_ == Atom::NONE {
            u32::from(xproto::AtomEnum::ANY)
        } else {
            type_.get()
        };
        let reply = self
            .conn
            .get_property(false, window.get(), property.get(), type_, 0, u32::MAX / 4)?
            .reply()?;
        if reply.type_ == x11rb::NONE || reply.format == 0 {
            return Ok(None);
        }
        Ok(Some(PropertyValue {
            type_: Atom(reply.type_),
            format: reply.format,
            data: reply.value,
        }))
    }

    fn delete_property(&self, window: NativeHandle, property: Atom) -> BackendResult<()> {
        self.conn.delete_property(window.get(), property.get())?;
        Ok(())
    }

    fn send_client_message(
        &self,
        destination: NativeHandle,
        window: NativeHandle,
        type_: Atom,
        data: [u32; 5],
        event_mask: u32,
    ) -> BackendResult<()> {
        let event = xproto::ClientMessageEvent {
            response_type: xproto::CLIENT_MESSAGE_EVENT,
            format: 32,
            sequence: 0,
            window: window.get(),
            type_: type_.get(),
            data: data.into(),
        };
        self.conn.send_event(
            false,
            destination.get(),
            xproto::EventMask::from(event_mask),
            event,
        )?;
        Ok(())
    }

    fn wait_for_event(&self) -> BackendResult<NativeEvent> {
        loop {
            let event = self.conn.wait_for_event()?;
            if let Some(native) = self.translate_event(event) {
                return Ok(native);
            }
        }
    }

    fn poll_event(&self, timeout: Duration) -> BackendResult<Option<NativeEvent>> {
        let deadline = Instant::now() + timeout;
        loop {
            while let Some(event) = self.conn.poll_for_event()? {
                if let Some(native) = self.translate_event(event) {
                    return Ok(Some(native));
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn flush(&self) -> BackendResult<()> {
        self.conn.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_coordinates_saturate() {
        assert_eq!(to_i16(-5), -5);
        assert_eq!(to_i16(40_000), i16::MAX);
        assert_eq!(to_i16(-40_000), i16::MIN);
        assert_eq!(to_u16(640), 640);
        assert_eq!(to_u16(70_000), u16::MAX);
    }
}
