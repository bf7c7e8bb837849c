//! Message pump
//!
//! Turns the native events and paints of one thread's queue into window
//! messages. Each UI thread runs its own `MessagePump`; a single
//! `EventReader` feeds all of them.

mod reader;

pub use reader::{route_event, EventReader};

use crate::error::Result;
use crate::protocol::{Atom, FocusDetail, NativeEvent};
use crate::queue::{ThreadQueue, Timer};
use crate::window::{make_lparam, Message, Msg, NativeWindow, WindowId, WindowRegistry};
use std::sync::Arc;
use std::time::Instant;

/// One notch of wheel movement
const WHEEL_DELTA: i16 = 120;

pub struct MessagePump {
    registry: Arc<WindowRegistry>,
    queue: Arc<ThreadQueue>,
}

impl MessagePump {
    /// Pump for the calling thread's queue
    pub fn new(registry: Arc<WindowRegistry>) -> Self {
        let queue = registry.queues().current();
        MessagePump { registry, queue }
    }

    pub fn registry(&self) -> &Arc<WindowRegistry> {
        &self.registry
    }

    pub fn queue(&self) -> &Arc<ThreadQueue> {
        &self.queue
    }

    /// Wait for the next message.
    ///
    /// Returns false when there is nothing to dispatch: `msg` then holds
    /// either `WM_QUIT` or, when the wait ended because a timer was due,
    /// `WM_ENTERIDLE`.
    pub fn get_message(&self, msg: &mut Message) -> bool {
        loop {
            self.queue.check_timers(Instant::now());
            // Requests made while dispatching must reach the server before
            // this thread sleeps
            self.registry.flush();
            let event = match self.queue.dequeue() {
                Some(event) => event,
                None => {
                    self.queue.check_timers(Instant::now());
                    *msg = Message::new(WindowId::NONE, Msg::ENTERIDLE, 0, 0);
                    return false;
                }
            };
            if let Some(m) = self.translate(event) {
                *msg = m;
                return m.msg != Msg::QUIT;
            }
        }
    }

    /// Fetch a message only if one is already queued. Never blocks: events
    /// that translate to nothing are consumed and the search goes on.
    pub fn peek_message(&self, msg: &mut Message) -> bool {
        self.queue.check_timers(Instant::now());
        while let Some(event) = self.queue.try_dequeue() {
            if let Some(m) = self.translate(event) {
                *msg = m;
                return m.msg != Msg::QUIT;
            }
        }
        false
    }

    /// Hand a message to the window procedure. Thread messages (no window)
    /// are not dispatched.
    pub fn dispatch_message(&self, msg: &Message) -> isize {
        if msg.window.is_none() {
            return 0;
        }
        self.registry
            .send_message(msg.window, msg.msg, msg.wparam, msg.lparam)
    }

    /// Dispatch everything already queued without running the idle handler
    pub fn do_events(&self) {
        self.queue.set_dispatch_idle(false);
        let mut msg = Message::new(WindowId::NONE, Msg::NULL, 0, 0);
        while self.peek_message(&mut msg) {
            self.dispatch_message(&msg);
            msg = Message::new(WindowId::NONE, Msg::NULL, 0, 0);
        }
        if msg.msg == Msg::QUIT {
            // Leave it for the outer loop
            self.queue.enqueue(NativeEvent::Posted(msg));
        }
        self.queue.set_dispatch_idle(true);
    }

    /// Run until `WM_QUIT` and return its exit code
    pub fn run(&self) -> i32 {
        let mut msg = Message::new(WindowId::NONE, Msg::NULL, 0, 0);
        loop {
            if self.get_message(&mut msg) {
                self.dispatch_message(&msg);
            } else if msg.msg == Msg::QUIT {
                return msg.wparam as i32;
            }
        }
    }

    pub fn post_message(&self, window: WindowId, msg: Msg, wparam: usize, lparam: isize) -> Result<()> {
        self.registry.post_message(window, msg, wparam, lparam)
    }

    /// Ask this thread's pump to stop
    pub fn post_quit(&self, exit_code: i32) {
        self.queue.enqueue(NativeEvent::Posted(Message::new(
            WindowId::NONE,
            Msg::QUIT,
            exit_code as usize,
            0,
        )));
    }

    pub fn set_timer(&self, timer: &Arc<Timer>) {
        self.queue.set_timer(timer);
    }

    pub fn kill_timer(&self, timer: &Arc<Timer>) {
        self.queue.kill_timer(timer);
    }

    fn translate(&self, event: NativeEvent) -> Option<Message> {
        if let NativeEvent::Posted(m) = event {
            return Some(m);
        }

        let id = self.registry.lookup(event.window())?;
        let window = self.registry.get(id)?;
        let (result, messages) = {
            let mut w = window.lock().unwrap();
            let result = self.translate_window_event(&mut w, id, event);
            (result, w.take_messages())
        };
        self.registry.deliver(messages);

        match result {
            Ok(m) => m,
            Err(e) => {
                log::warn!("Error handling event for window {}: {}", id, e);
                None
            }
        }
    }

    fn translate_window_event(
        &self,
        w: &mut NativeWindow,
        id: WindowId,
        event: NativeEvent,
    ) -> Result<Option<Message>> {
        let message = |msg: Msg, wparam: usize, lparam: isize| -> Result<Option<Message>> {
            Ok(Some(Message::new(id, msg, wparam, lparam)))
        };

        if w.is_zombie() {
            if event.is_expose() {
                w.begin_paint(true);
                w.begin_paint(false);
            }
            return Ok(None);
        }

        match event {
            NativeEvent::Expose { window, .. } => {
                let client = window == w.client();
                if !w.is_mapped() {
                    w.begin_paint(client);
                    return Ok(None);
                }
                message(if client { Msg::PAINT } else { Msg::NCPAINT }, 0, 0)
            }
            NativeEvent::Configure { window, .. } => {
                if window != w.frame() {
                    return Ok(None);
                }
                w.configure_dispatched()?;
                message(Msg::WINDOWPOSCHANGED, 0, 0)
            }
            NativeEvent::MapNotify { window, .. } => {
                if window == w.client() {
                    return message(Msg::SHOWWINDOW, 1, 0);
                }
                if window == w.frame() {
                    w.set_mapped_from_server(true);
                }
                Ok(None)
            }
            NativeEvent::UnmapNotify { window, .. } => {
                if window == w.client() {
                    return message(Msg::SHOWWINDOW, 0, 0);
                }
                if window == w.frame() {
                    w.set_mapped_from_server(false);
                }
                Ok(None)
            }
            NativeEvent::ReparentNotify { window, parent, .. } => {
                if window == w.frame() && w.handle_reparent_notify(parent)? {
                    return message(Msg::WINDOWPOSCHANGED, 0, 0);
                }
                Ok(None)
            }
            NativeEvent::DestroyNotify { window, .. } => {
                if window != w.frame() {
                    return Ok(None);
                }
                // Destroyed behind our back
                self.registry.forget(id);
                message(Msg::DESTROY, 0, 0)
            }
            NativeEvent::PropertyNotify { window, atom, .. } => {
                if window == w.frame() {
                    w.handle_property_notify(atom)?;
                }
                Ok(None)
            }
            NativeEvent::ClientMessage { type_, data, .. } => {
                let atoms = self.registry.display().atoms();
                if type_ != atoms.WM_PROTOCOLS {
                    return Ok(None);
                }
                let protocol = Atom(data[0]);
                if protocol == atoms.WM_DELETE_WINDOW {
                    message(Msg::CLOSE, 0, 0)
                } else if protocol == atoms._NET_WM_CONTEXT_HELP {
                    message(Msg::HELP, 0, 0)
                } else {
                    Ok(None)
                }
            }
            NativeEvent::FocusIn { detail, .. } => match detail {
                FocusDetail::Nonlinear => message(Msg::SETFOCUS, 0, 0),
                FocusDetail::Other => Ok(None),
            },
            NativeEvent::FocusOut { detail, .. } => match detail {
                FocusDetail::Nonlinear => message(Msg::KILLFOCUS, 0, 0),
                FocusDetail::Other => Ok(None),
            },
            NativeEvent::KeyPress { keycode, state, .. } => {
                message(Msg::KEYDOWN, keycode as usize, state as isize)
            }
            NativeEvent::KeyRelease { keycode, state, .. } => {
                message(Msg::KEYUP, keycode as usize, state as isize)
            }
            NativeEvent::ButtonPress {
                button, state, x, y, ..
            } => {
                let lparam = make_lparam(x, y);
                match button {
                    1 => message(Msg::LBUTTONDOWN, state as usize, lparam),
                    2 => message(Msg::MBUTTONDOWN, state as usize, lparam),
                    3 => message(Msg::RBUTTONDOWN, state as usize, lparam),
                    4 | 5 => {
                        let delta = if button == 4 { WHEEL_DELTA } else { -WHEEL_DELTA };
                        let wparam = ((delta as u16 as usize) << 16) | state as usize;
                        message(Msg::MOUSEWHEEL, wparam, lparam)
                    }
                    _ => Ok(None),
                }
            }
            NativeEvent::ButtonRelease {
                button, state, x, y, ..
            } => {
                let lparam = make_lparam(x, y);
                match button {
                    1 => message(Msg::LBUTTONUP, state as usize, lparam),
                    2 => message(Msg::MBUTTONUP, state as usize, lparam),
                    3 => message(Msg::RBUTTONUP, state as usize, lparam),
                    _ => Ok(None),
                }
            }
            NativeEvent::MotionNotify { state, x, y, .. } => {
                message(Msg::MOUSEMOVE, state as usize, make_lparam(x, y))
            }
            NativeEvent::LeaveNotify { .. } => message(Msg::MOUSELEAVE, 0, 0),
            NativeEvent::EnterNotify { .. } | NativeEvent::Posted(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DisplayConnection, NullDisplay};
    use crate::protocol::{NativeHandle, Rect};
    use crate::window::{CreateParams, WS_VISIBLE};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn setup() -> (Arc<NullDisplay>, MessagePump, WindowId) {
        let display = Arc::new(NullDisplay::new());
        let registry = Arc::new(WindowRegistry::new(display.clone()));
        let pump = MessagePump::new(registry.clone());
        let id = registry
            .create_window(
                &CreateParams::new("pump")
                    .with_bounds(0, 0, 100, 100)
                    .with_style(WS_VISIBLE),
            )
            .unwrap();
        (display, pump, id)
    }

    fn handles(pump: &MessagePump, id: WindowId) -> (NativeHandle, NativeHandle) {
        pump.registry()
            .with_window(id, |w| Ok((w.frame(), w.client())))
            .unwrap()
    }

    fn next(pump: &MessagePump) -> Message {
        let mut msg = Message::new(WindowId::NONE, Msg::NULL, 0, 0);
        assert!(pump.peek_message(&mut msg), "expected a message");
        msg
    }

    #[test]
    fn test_close_request() {
        let (display, pump, id) = setup();
        let (frame, _) = handles(&pump, id);
        let atoms = *display.atoms();
        pump.queue().enqueue(NativeEvent::ClientMessage {
            window: frame,
            type_: atoms.WM_PROTOCOLS,
            data: [atoms.WM_DELETE_WINDOW.get(), 0, 0, 0, 0],
        });
        assert_eq!(next(&pump), Message::new(id, Msg::CLOSE, 0, 0));
    }

    #[test]
    fn test_events_before_paint() {
        let (_display, pump, id) = setup();
        let (_, client) = handles(&pump, id);
        pump.registry()
            .with_window(id, |w| {
                w.invalidate(Rect::new(0, 0, 10, 10), false);
                Ok(())
            })
            .unwrap();
        pump.queue().enqueue(NativeEvent::MotionNotify {
            window: client,
            state: 0,
            time: 0,
            x: 3,
            y: 4,
        });
        assert_eq!(next(&pump).msg, Msg::MOUSEMOVE);
        let paint = next(&pump);
        assert_eq!(paint.msg, Msg::PAINT);
        pump.dispatch_message(&paint);
        assert_eq!(pump.queue().paint_count(), 0);
    }

    #[test]
    fn test_client_and_frame_paint_visited_separately() {
        let (_display, pump, id) = setup();
        pump.registry()
            .with_window(id, |w| {
                w.invalidate_nc();
                w.invalidate(Rect::new(0, 0, 10, 10), false);
                Ok(())
            })
            .unwrap();
        assert_eq!(pump.queue().paint_count(), 1);

        let first = next(&pump);
        assert_eq!(first.msg, Msg::PAINT);
        pump.dispatch_message(&first);
        let second = next(&pump);
        assert_eq!(second.msg, Msg::NCPAINT);
        pump.dispatch_message(&second);
        assert_eq!(pump.queue().count(), 0);
    }

    #[test]
    fn test_configure_clears_pending() {
        let (_display, pump, id) = setup();
        let (frame, _) = handles(&pump, id);
        route_event(
            pump.registry(),
            NativeEvent::Configure {
                window: frame,
                x: 0,
                y: 0,
                width: 200,
                height: 150,
                synthetic: false,
            },
        );
        let msg = next(&pump);
        assert_eq!(msg.msg, Msg::WINDOWPOSCHANGED);
        let window = pump.registry().get(id).unwrap();
        let w = window.lock().unwrap();
        assert!(!w.configure_pending());
        assert_eq!(w.client_rect(), Rect::new(0, 0, 200, 150));
    }

    #[test]
    fn test_unmapped_expose_dropped() {
        let (_display, pump, id) = setup();
        pump.registry()
            .with_window(id, |w| {
                w.set_visible(false)?;
                w.invalidate(Rect::new(0, 0, 10, 10), false);
                Ok(())
            })
            .unwrap();
        assert_eq!(pump.queue().paint_count(), 1);

        // Without a timer the pump would block once the paint is swallowed
        let timer = Arc::new(Timer::new(Duration::from_millis(20), |_| {}));
        pump.set_timer(&timer);
        pump.queue().set_dispatch_idle(false);
        let mut msg = Message::new(WindowId::NONE, Msg::NULL, 0, 0);
        assert!(!pump.get_message(&mut msg));
        assert_eq!(msg.msg, Msg::ENTERIDLE);
        assert_eq!(pump.queue().paint_count(), 0);
    }

    #[test]
    fn test_focus_detail_filter() {
        let (_display, pump, id) = setup();
        let (frame, _) = handles(&pump, id);
        pump.queue().enqueue(NativeEvent::FocusIn {
            window: frame,
            detail: FocusDetail::Other,
        });
        pump.queue().enqueue(NativeEvent::FocusOut {
            window: frame,
            detail: FocusDetail::Nonlinear,
        });
        assert_eq!(next(&pump).msg, Msg::KILLFOCUS);
    }

    #[test]
    fn test_wheel_and_buttons() {
        let (_display, pump, id) = setup();
        let (_, client) = handles(&pump, id);
        for button in [1, 4] {
            pump.queue().enqueue(NativeEvent::ButtonPress {
                window: client,
                button,
                state: 0,
                time: 0,
                x: 7,
                y: 9,
            });
        }
        let down = next(&pump);
        assert_eq!(down.msg, Msg::LBUTTONDOWN);
        assert_eq!(down.lparam, make_lparam(7, 9));
        let wheel = next(&pump);
        assert_eq!(wheel.msg, Msg::MOUSEWHEEL);
        assert_eq!(wheel.wparam >> 16, 120);
    }

    #[test]
    fn test_timer_due_returns_idle() {
        let (_display, pump, _id) = setup();
        let timer = Arc::new(Timer::new(Duration::from_millis(5), |_| {}));
        pump.set_timer(&timer);
        pump.queue().set_dispatch_idle(false);
        let mut msg = Message::new(WindowId::NONE, Msg::NULL, 0, 0);
        assert!(!pump.get_message(&mut msg));
        assert_eq!(msg.msg, Msg::ENTERIDLE);
        assert!(timer.expires() > Instant::now() - Duration::from_millis(1));
        pump.kill_timer(&timer);
    }

    #[test]
    fn test_do_events_keeps_quit() {
        let (_display, pump, id) = setup();
        pump.post_message(id, Msg::USER, 0, 0).unwrap();
        pump.post_quit(0);
        pump.do_events();
        assert!(pump.queue().dispatch_idle());
        let mut msg = Message::new(WindowId::NONE, Msg::NULL, 0, 0);
        assert!(!pump.peek_message(&mut msg));
        assert_eq!(msg.msg, Msg::QUIT);
    }

    #[test]
    fn test_peek_skips_events_without_message() {
        let (_display, pump, id) = setup();
        pump.do_events();
        let (_, client) = handles(&pump, id);
        pump.queue().enqueue(NativeEvent::EnterNotify {
            window: client,
            x: 1,
            y: 1,
        });
        let mut msg = Message::new(WindowId::NONE, Msg::NULL, 0, 0);
        assert!(!pump.peek_message(&mut msg));
        assert_eq!(msg.msg, Msg::NULL);
        assert_eq!(pump.queue().count(), 0);
    }

    #[test]
    fn test_do_events_returns_when_only_dropped_events_queued() {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let (_display, pump, id) = setup();
            let (_, client) = handles(&pump, id);
            pump.queue().enqueue(NativeEvent::EnterNotify {
                window: client,
                x: 0,
                y: 0,
            });
            pump.do_events();
            tx.send(pump.queue().count()).unwrap();
        });
        let left = rx
            .recv_timeout(Duration::from_secs(3))
            .expect("do_events blocked");
        assert_eq!(left, 0);
    }

    #[test]
    fn test_get_message_flushes_before_waiting() {
        let (display, pump, _id) = setup();
        let before = display.calls().flushes;
        pump.post_quit(0);
        let mut msg = Message::new(WindowId::NONE, Msg::NULL, 0, 0);
        assert!(!pump.get_message(&mut msg));
        assert!(display.calls().flushes > before);
    }

    #[test]
    fn test_destroyed_window_events_dropped() {
        let (_display, pump, id) = setup();
        let (_, client) = handles(&pump, id);
        pump.registry().destroy_window(id).unwrap();
        pump.queue().enqueue(NativeEvent::KeyPress {
            window: client,
            keycode: 10,
            state: 0,
            time: 0,
        });
        pump.post_quit(0);
        let mut msg = Message::new(WindowId::NONE, Msg::NULL, 0, 0);
        assert!(!pump.get_message(&mut msg));
        assert_eq!(msg.msg, Msg::QUIT);
    }
}
