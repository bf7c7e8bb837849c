//! Per-thread event queues
//!
//! Every UI thread owns one `ThreadQueue`. It multiplexes three sources into
//! one ordered stream: native events in a FIFO ring, windows with pending
//! paints, and timers. A single mutex and condition variable guard all
//! three, and every change wakes all waiters, so a blocked `dequeue`
//! re-checks everything whatever woke it.
//!
//! Ordering: ring events always win over paints; paints are handed out in
//! the order windows were first invalidated. A window with both a client and
//! a non-client paint pending is visited twice before it leaves the list.

pub mod registry;
pub mod ring;
pub mod timer;

pub use registry::QueueRegistry;
pub use ring::EventRing;
pub use timer::{Timer, MINIMUM_TIMEOUT};

use crate::protocol::NativeEvent;
use crate::window::PaintState;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// Callback fired once per drain of the queue
pub type IdleHandler = Arc<dyn Fn() + Send + Sync>;

struct QueueInner {
    ring: EventRing,
    paint: VecDeque<Arc<PaintState>>,
    timers: Vec<Weak<Timer>>,
    idle: Option<IdleHandler>,
    dispatch_idle: bool,
    idle_pending: bool,
}

impl QueueInner {
    /// Drop paint entries whose window no longer has anything pending
    fn prune_paint(&mut self) {
        while let Some(head) = self.paint.front() {
            if head.any_pending() {
                break;
            }
            self.paint.pop_front();
        }
    }

    fn dequeue_paint(&mut self) -> NativeEvent {
        let head = match self.paint.front() {
            Some(head) => head.clone(),
            None => panic!("dequeue_paint called on an empty paint list"),
        };
        // Flags are read once so a concurrent validation cannot drop the
        // entry while the other kind is still owed
        let (event, both) = head.next_expose();
        if !both {
            self.paint.pop_front();
        }
        event
    }

    /// Ring event, else paint, without waiting
    fn next_ready(&mut self) -> Option<NativeEvent> {
        if let Some(event) = self.ring.pop() {
            return Some(event);
        }
        self.prune_paint();
        if self.paint.is_empty() {
            None
        } else {
            Some(self.dequeue_paint())
        }
    }

    fn live_timers(&mut self) -> Vec<Arc<Timer>> {
        self.timers.retain(|t| t.strong_count() > 0);
        self.timers.iter().filter_map(Weak::upgrade).collect()
    }

    fn next_timeout(&mut self, now: Instant) -> Option<Duration> {
        let mut timeout: Option<Duration> = None;
        for timer in self.live_timers() {
            if !timer.enabled() {
                continue;
            }
            match timer.expires().checked_duration_since(now) {
                // Already expired
                None => return Some(Duration::ZERO),
                Some(next) => {
                    timeout = Some(timeout.map_or(next, |t| t.min(next)));
                }
            }
        }
        timeout.map(|t| t.max(MINIMUM_TIMEOUT))
    }
}

pub struct ThreadQueue {
    thread: ThreadId,
    inner: Mutex<QueueInner>,
    wakeup: Condvar,
}

/// The queue lock, held for a batch of enqueues.
///
/// Waiters are woken when the guard is dropped.
pub struct QueueLock<'a> {
    queue: &'a ThreadQueue,
    inner: MutexGuard<'a, QueueInner>,
    dirty: bool,
}

impl QueueLock<'_> {
    pub fn enqueue(&mut self, event: NativeEvent) {
        self.inner.ring.push(event);
        self.dirty = true;
    }

    pub fn event_count(&self) -> usize {
        self.inner.ring.len()
    }
}

impl Drop for QueueLock<'_> {
    fn drop(&mut self) {
        if self.dirty {
            self.queue.wakeup.notify_all();
        }
    }
}

impl ThreadQueue {
    /// Queue serving `thread`
    pub fn new(thread: ThreadId) -> Self {
        ThreadQueue {
            thread,
            inner: Mutex::new(QueueInner {
                ring: EventRing::new(),
                paint: VecDeque::new(),
                timers: Vec::new(),
                idle: None,
                dispatch_idle: true,
                idle_pending: false,
            }),
            wakeup: Condvar::new(),
        }
    }

    /// Queue serving the calling thread (not registered anywhere)
    pub fn for_current_thread() -> Self {
        Self::new(thread::current().id())
    }

    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    /// Take the queue lock for batched enqueues
    pub fn lock(&self) -> QueueLock<'_> {
        QueueLock {
            queue: self,
            inner: self.inner.lock().unwrap(),
            dirty: false,
        }
    }

    pub fn enqueue(&self, event: NativeEvent) {
        self.lock().enqueue(event);
    }

    /// Native events waiting in the ring
    pub fn event_count(&self) -> usize {
        self.inner.lock().unwrap().ring.len()
    }

    /// Paint list entries
    pub fn paint_count(&self) -> usize {
        self.inner.lock().unwrap().paint.len()
    }

    /// Everything waiting: ring events plus paint entries
    pub fn count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.ring.len() + inner.paint.len()
    }

    /// Append a window to the paint list. No deduplication happens here; the
    /// window's paint flags decide whether it needs to be added.
    pub fn add_paint(&self, paint: &Arc<PaintState>) {
        self.inner.lock().unwrap().paint.push_back(paint.clone());
        log::trace!("Paint queued for window {}", paint.window());
        self.wakeup.notify_all();
    }

    /// Remove a window's paint entry, but only once neither of its paint
    /// flags is still set. A window that is still owed a paint but already
    /// left the list is appended again.
    pub fn remove_paint(&self, paint: &Arc<PaintState>) {
        let mut inner = self.inner.lock().unwrap();
        let pos = inner.paint.iter().position(|p| Arc::ptr_eq(p, paint));
        match (paint.any_pending(), pos) {
            (false, Some(pos)) => {
                inner.paint.remove(pos);
            }
            (true, None) => {
                inner.paint.push_back(paint.clone());
                drop(inner);
                log::trace!("Paint requeued for window {}", paint.window());
                self.wakeup.notify_all();
            }
            _ => {}
        }
    }

    /// Exposure record for the head of the paint list.
    ///
    /// # Panics
    /// If the paint list is empty.
    pub fn peek_paint(&self) -> NativeEvent {
        let inner = self.inner.lock().unwrap();
        match inner.paint.front() {
            Some(head) => head.next_expose().0,
            None => panic!("peek_paint called on an empty paint list"),
        }
    }

    /// Exposure record for the head of the paint list; the head is removed
    /// unless both of its paint kinds are pending.
    ///
    /// # Panics
    /// If the paint list is empty.
    pub fn dequeue_paint(&self) -> NativeEvent {
        self.inner.lock().unwrap().dequeue_paint()
    }

    /// Oldest ring event without removing it.
    ///
    /// # Panics
    /// If the ring is empty.
    pub fn peek_event(&self) -> NativeEvent {
        match self.inner.lock().unwrap().ring.peek() {
            Some(event) => event.clone(),
            None => panic!("peek_event called on an empty event ring"),
        }
    }

    /// Register a timer. The queue only keeps a weak reference.
    pub fn set_timer(&self, timer: &Arc<Timer>) {
        let mut inner = self.inner.lock().unwrap();
        let weak = Arc::downgrade(timer);
        if !inner.timers.iter().any(|t| t.ptr_eq(&weak)) {
            inner.timers.push(weak);
        }
        drop(inner);
        self.wakeup.notify_all();
    }

    pub fn kill_timer(&self, timer: &Arc<Timer>) {
        let mut inner = self.inner.lock().unwrap();
        let weak = Arc::downgrade(timer);
        inner.timers.retain(|t| !t.ptr_eq(&weak));
        drop(inner);
        self.wakeup.notify_all();
    }

    pub fn timer_count(&self) -> usize {
        self.inner.lock().unwrap().live_timers().len()
    }

    /// Time until the earliest timer is due: zero if one already expired,
    /// never less than `MINIMUM_TIMEOUT` otherwise, `None` when no timer is
    /// registered.
    pub fn next_timeout(&self, now: Instant) -> Option<Duration> {
        self.inner.lock().unwrap().next_timeout(now)
    }

    /// Advance and fire every expired timer.
    ///
    /// Ticks run outside the queue lock, so a tick may set or kill timers
    /// and enqueue events.
    pub fn check_timers(&self, now: Instant) {
        let timers = self.inner.lock().unwrap().live_timers();
        for timer in timers {
            if timer.update(now) {
                timer.fire_tick();
            }
        }
    }

    pub fn set_idle_handler(&self, handler: Option<IdleHandler>) {
        self.inner.lock().unwrap().idle = handler;
    }

    pub fn dispatch_idle(&self) -> bool {
        self.inner.lock().unwrap().dispatch_idle
    }

    pub fn set_dispatch_idle(&self, dispatch: bool) {
        self.inner.lock().unwrap().dispatch_idle = dispatch;
    }

    /// Wake every thread blocked in `dequeue`
    pub fn wake(&self) {
        self.wakeup.notify_all();
    }

    /// Next ring event or paint if one is ready. Never waits and never runs
    /// the idle handler.
    pub fn try_dequeue(&self) -> Option<NativeEvent> {
        let mut inner = self.inner.lock().unwrap();
        let event = inner.next_ready();
        if event.is_some() {
            inner.idle_pending = true;
        }
        event
    }

    /// Next event for the pump.
    ///
    /// Returns ring events first, then paints. When both are drained the idle
    /// handler fires once; after that the call blocks until a producer signals
    /// or the earliest timer is due. `None` means a timer is due (or the wait
    /// timed out with nothing queued): the caller should run `check_timers`.
    pub fn dequeue(&self) -> Option<NativeEvent> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(event) = inner.next_ready() {
                inner.idle_pending = true;
                return Some(event);
            }

            if inner.dispatch_idle && inner.idle_pending {
                inner.idle_pending = false;
                let idle = inner.idle.clone();
                if let Some(idle) = idle {
                    drop(inner);
                    idle();
                    inner = self.inner.lock().unwrap();
                }
                continue;
            }

            let timeout = inner.next_timeout(Instant::now());
            match timeout {
                None => {
                    inner = self.wakeup.wait(inner).unwrap();
                }
                Some(timeout) if timeout.is_zero() => return None,
                Some(timeout) => {
                    let (guard, result) = self.wakeup.wait_timeout(inner, timeout).unwrap();
                    inner = guard;
                    if result.timed_out() && inner.ring.is_empty() {
                        inner.prune_paint();
                        if inner.paint.is_empty() {
                            return None;
                        }
                    }
                }
            }
        }
    }
}

impl fmt::Debug for ThreadQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("ThreadQueue")
            .field("thread", &self.thread)
            .field("events", &inner.ring.len())
            .field("paints", &inner.paint.len())
            .field("timers", &inner.timers.len())
            .finish()
    }
}
