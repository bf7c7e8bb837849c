//! End-to-end message loop tests against the in-memory display
//!
//! Events enter through the display, pass the reader thread and come out of
//! `MessagePump::run` as window procedure calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use x11hwnd::backend::{DisplayConnection, NullDisplay};
use x11hwnd::protocol::Rect;
use x11hwnd::window::{WS_CAPTION, WS_THICKFRAME, WS_VISIBLE};
use x11hwnd::{
    CreateParams, EventReader, Message, MessagePump, Msg, NativeEvent, ThreadQueue, Timer,
    WindowId, WindowProc, WindowRegistry,
};

fn quit_message(code: i32) -> NativeEvent {
    NativeEvent::Posted(Message::new(WindowId::NONE, Msg::QUIT, code as usize, 0))
}

/// Records every message and posts `WM_QUIT` when `quit_on` arrives
struct Recorder {
    seen: Mutex<Vec<(WindowId, Msg)>>,
    quit_on: Msg,
    queue: Arc<ThreadQueue>,
}

impl Recorder {
    fn new(quit_on: Msg, queue: Arc<ThreadQueue>) -> Arc<Self> {
        Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            quit_on,
            queue,
        })
    }

    fn messages(&self) -> Vec<Msg> {
        self.seen.lock().unwrap().iter().map(|(_, m)| *m).collect()
    }
}

impl WindowProc for Recorder {
    fn window_proc(&self, window: WindowId, msg: Msg, _wparam: usize, _lparam: isize) -> isize {
        self.seen.lock().unwrap().push((window, msg));
        if msg == self.quit_on {
            self.queue.enqueue(quit_message(42));
        }
        0
    }
}

fn visible_window(registry: &WindowRegistry) -> WindowId {
    registry
        .create_window(
            &CreateParams::new("loop")
                .with_bounds(10, 10, 200, 100)
                .with_style(WS_VISIBLE | WS_CAPTION | WS_THICKFRAME),
        )
        .unwrap()
}

#[test]
fn test_close_button_reaches_window_proc() {
    let display = Arc::new(NullDisplay::new());
    let registry = Arc::new(WindowRegistry::new(display.clone()));
    let pump = MessagePump::new(registry.clone());
    let recorder = Recorder::new(Msg::CLOSE, pump.queue().clone());
    registry.set_window_proc(recorder.clone());

    let id = visible_window(&registry);
    let frame = registry.with_window(id, |w| Ok(w.frame())).unwrap();
    let atoms = *display.atoms();
    display.push_event(NativeEvent::ClientMessage {
        window: frame,
        type_: atoms.WM_PROTOCOLS,
        data: [atoms.WM_DELETE_WINDOW.get(), 0, 0, 0, 0],
    });

    let reader = EventReader::spawn(registry.clone()).unwrap();
    assert_eq!(pump.run(), 42);
    display.close();
    reader.join();

    let messages = recorder.messages();
    assert_eq!(messages.first(), Some(&Msg::CREATE));
    assert_eq!(messages.last(), Some(&Msg::CLOSE));
}

#[test]
fn test_server_expose_dispatches_paint() {
    let display = Arc::new(NullDisplay::new());
    let registry = Arc::new(WindowRegistry::new(display.clone()));
    let pump = MessagePump::new(registry.clone());
    let recorder = Recorder::new(Msg::PAINT, pump.queue().clone());
    registry.set_window_proc(recorder.clone());

    let id = visible_window(&registry);
    let client = registry.with_window(id, |w| Ok(w.client())).unwrap();
    display.push_event(NativeEvent::Expose {
        window: client,
        area: Some(Rect::new(0, 0, 20, 20)),
    });
    display.close();

    let reader = EventReader::spawn(registry.clone()).unwrap();
    reader.join();
    assert_eq!(pump.queue().paint_count(), 1);

    assert_eq!(pump.run(), 42);
    // Nobody called begin_paint: the paint must not come back
    assert_eq!(pump.queue().count(), 0);
}

#[test]
fn test_post_from_another_thread_wakes_pump() {
    let display = Arc::new(NullDisplay::new());
    let registry = Arc::new(WindowRegistry::new(display));
    let (tx, rx) = mpsc::channel();

    let worker_registry = registry.clone();
    let worker = thread::spawn(move || {
        let pump = MessagePump::new(worker_registry.clone());
        let recorder = Recorder::new(Msg::USER, pump.queue().clone());
        worker_registry.set_window_proc(recorder.clone());
        let id = visible_window(&worker_registry);
        tx.send(id).unwrap();
        let code = pump.run();
        (code, recorder.messages())
    });

    let id = rx.recv().unwrap();
    // The pump is (or soon will be) blocked with nothing queued
    thread::sleep(Duration::from_millis(20));
    registry.post_message(id, Msg::USER, 1, 2).unwrap();

    let (code, messages) = worker.join().unwrap();
    assert_eq!(code, 42);
    assert!(messages.contains(&Msg::USER));
}

#[test]
fn test_timer_ticks_until_quit() {
    let display = Arc::new(NullDisplay::new());
    let registry = Arc::new(WindowRegistry::new(display));
    let pump = MessagePump::new(registry.clone());

    let ticks = Arc::new(AtomicUsize::new(0));
    let queue = pump.queue().clone();
    let counter = ticks.clone();
    let timer = Arc::new(Timer::new(Duration::from_millis(2), move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
            queue.enqueue(quit_message(3));
        }
    }));
    pump.set_timer(&timer);

    assert_eq!(pump.run(), 3);
    assert_eq!(ticks.load(Ordering::SeqCst), 3);
    pump.kill_timer(&timer);
    assert_eq!(pump.queue().timer_count(), 0);
}

#[test]
fn test_idle_handler_fires_once_per_drain() {
    let display = Arc::new(NullDisplay::new());
    let registry = Arc::new(WindowRegistry::new(display));
    let pump = MessagePump::new(registry.clone());
    let id = visible_window(&registry);

    let idles = Arc::new(AtomicUsize::new(0));
    let counter = idles.clone();
    let queue = Arc::downgrade(pump.queue());
    pump.queue().set_idle_handler(Some(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(queue) = queue.upgrade() {
            queue.enqueue(quit_message(0));
        }
    })));

    pump.post_message(id, Msg::USER, 0, 0).unwrap();
    pump.post_message(id, Msg::USER, 1, 0).unwrap();
    assert_eq!(pump.run(), 0);
    assert_eq!(idles.load(Ordering::SeqCst), 1);
}

#[test]
fn test_quit_from_window_thread() {
    let display = Arc::new(NullDisplay::new());
    let registry = Arc::new(WindowRegistry::new(display));
    let pump = MessagePump::new(registry.clone());

    registry.post_quit(5);
    let mut msg = Message::new(WindowId::NONE, Msg::NULL, 0, 0);
    assert!(!pump.get_message(&mut msg));
    assert_eq!(msg.msg, Msg::QUIT);
    assert_eq!(msg.wparam, 5);
}
