//! Event reader thread
//!
//! Blocks on the display, folds exposures and configure notifications into
//! window state and hands everything else to the queue of the thread that
//! owns the target window.

use crate::protocol::{NativeEvent, Rect};
use crate::window::WindowRegistry;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub struct EventReader {
    handle: Option<JoinHandle<()>>,
}

impl EventReader {
    /// Start reading events. The thread exits when the display connection
    /// fails or is closed.
    pub fn spawn(registry: Arc<WindowRegistry>) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name("x11hwnd-events".to_string())
            .spawn(move || run(&registry))?;
        Ok(EventReader {
            handle: Some(handle),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the reader to exit
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Event reader thread panicked");
            }
        }
    }
}

fn run(registry: &WindowRegistry) {
    let display = registry.display().clone();
    let mut lookahead: Option<NativeEvent> = None;
    log::debug!("Event reader started");

    loop {
        let event = match lookahead.take() {
            Some(event) => event,
            None => match display.wait_for_event() {
                Ok(event) => event,
                Err(e) => {
                    log::error!("Event reader stopping: {}", e);
                    break;
                }
            },
        };

        if let NativeEvent::KeyRelease { keycode, time, .. } = event {
            // Auto-repeat shows up as a release immediately followed by a
            // press with the same keycode and timestamp: keep only the press
            match display.poll_event(Duration::ZERO) {
                Ok(Some(next)) => {
                    if is_repeat_of(&next, keycode, time) {
                        log::trace!("Coalesced auto-repeat of key {}", keycode);
                    } else {
                        route_event(registry, event);
                    }
                    lookahead = Some(next);
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    route_event(registry, event);
                    log::error!("Event reader stopping: {}", e);
                    break;
                }
            }
        }

        route_event(registry, event);
    }
}

fn is_repeat_of(next: &NativeEvent, keycode: u8, time: u32) -> bool {
    matches!(*next, NativeEvent::KeyPress { keycode: k, time: t, .. } if k == keycode && t == time)
}

/// Hand one native event to the window it belongs to.
///
/// Events for windows the registry does not know are dropped.
pub fn route_event(registry: &WindowRegistry, event: NativeEvent) {
    let id = match registry.lookup(event.window()) {
        Some(id) => id,
        None => {
            log::trace!("Dropping event for unknown window {}", event.window());
            return;
        }
    };

    let result = match event {
        NativeEvent::Expose { window, area } => registry.with_window(id, |w| {
            let client = window == w.client();
            let bounds = w.bounds();
            let area = area.unwrap_or(Rect::new(0, 0, bounds.width, bounds.height));
            w.add_expose(client, area.x, area.y, area.width, area.height);
            Ok(())
        }),
        event @ NativeEvent::Configure { .. } => {
            registry.with_window(id, |w| w.handle_configure_notify(&event).map(|_| ()))
        }
        event => {
            if let Some(queue) = registry.queue_of(id) {
                queue.enqueue(event);
            }
            Ok(())
        }
    };

    if let Err(e) = result {
        log::warn!("Failed to route event for window {}: {}", id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DisplayConnection, NullDisplay};
    use crate::protocol::NativeHandle;
    use crate::window::{CreateParams, WS_VISIBLE};

    fn key(release: bool, keycode: u8, time: u32, window: NativeHandle) -> NativeEvent {
        if release {
            NativeEvent::KeyRelease {
                window,
                keycode,
                state: 0,
                time,
            }
        } else {
            NativeEvent::KeyPress {
                window,
                keycode,
                state: 0,
                time,
            }
        }
    }

    #[test]
    fn test_repeat_detection() {
        let w = NativeHandle(1);
        assert!(is_repeat_of(&key(false, 38, 100, w), 38, 100));
        assert!(!is_repeat_of(&key(false, 38, 101, w), 38, 100));
        assert!(!is_repeat_of(&key(true, 38, 100, w), 38, 100));
    }

    #[test]
    fn test_server_expose_becomes_paint() {
        let display = Arc::new(NullDisplay::new());
        let registry = WindowRegistry::new(display.clone());
        let id = registry
            .create_window(&CreateParams::new("").with_style(WS_VISIBLE))
            .unwrap();
        let client = registry.with_window(id, |w| Ok(w.client())).unwrap();

        route_event(
            &registry,
            NativeEvent::Expose {
                window: client,
                area: Some(Rect::new(0, 0, 5, 5)),
            },
        );
        let queue = registry.queue_of(id).unwrap();
        assert_eq!(queue.event_count(), 0);
        assert_eq!(queue.paint_count(), 1);
    }

    #[test]
    fn test_unknown_window_dropped() {
        let display = Arc::new(NullDisplay::new());
        let registry = WindowRegistry::new(display.clone());
        route_event(
            &registry,
            NativeEvent::FocusIn {
                window: display.root_window(),
                detail: crate::protocol::FocusDetail::Nonlinear,
            },
        );
        assert_eq!(registry.queues().current().count(), 0);
    }

    #[test]
    fn test_reader_coalesces_autorepeat() {
        let display = Arc::new(NullDisplay::new());
        let registry = Arc::new(WindowRegistry::new(display.clone()));
        let id = registry
            .create_window(&CreateParams::new("").with_style(WS_VISIBLE))
            .unwrap();
        let client = registry.with_window(id, |w| Ok(w.client())).unwrap();

        display.push_event(key(false, 38, 10, client));
        display.push_event(key(true, 38, 20, client));
        display.push_event(key(false, 38, 20, client));
        display.push_event(key(true, 38, 30, client));
        display.close();

        let reader = EventReader::spawn(registry.clone()).unwrap();
        reader.join();

        let queue = registry.queue_of(id).unwrap();
        let events: Vec<_> = (0..queue.event_count())
            .map(|_| queue.dequeue().unwrap())
            .collect();
        assert_eq!(
            events,
            vec![
                key(false, 38, 10, client),
                key(false, 38, 20, client),
                key(true, 38, 30, client),
            ]
        );
    }
}
