//! Window registry
//!
//! Owns every live `NativeWindow` and maps native handles back to them.
//! Windows only refer to each other by `WindowId`; the registry resolves
//! those ids when a window needs a parent's handles.

use super::*;
use crate::backend::DisplayConnection;
use crate::error::{Error, Result};
use crate::protocol::{NativeEvent, NativeHandle};
use crate::queue::{QueueRegistry, ThreadQueue};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

/// Shared, lockable window record
pub type WindowRef = Arc<Mutex<NativeWindow>>;

struct Entry {
    window: WindowRef,
    queue: Arc<ThreadQueue>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u32,
    windows: HashMap<WindowId, Entry>,
    handles: HashMap<NativeHandle, WindowId>,
}

pub struct WindowRegistry {
    display: Arc<dyn DisplayConnection>,
    queues: Arc<QueueRegistry>,
    policy: Arc<dyn StylePolicy>,
    window_proc: RwLock<Arc<dyn WindowProc>>,
    inner: Mutex<RegistryInner>,
}

impl WindowRegistry {
    pub fn new(display: Arc<dyn DisplayConnection>) -> Self {
        WindowRegistry {
            display,
            queues: Arc::new(QueueRegistry::new()),
            policy: Arc::new(DefaultStylePolicy),
            window_proc: RwLock::new(Arc::new(DefaultWindowProc)),
            inner: Mutex::new(RegistryInner {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn StylePolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_queues(mut self, queues: Arc<QueueRegistry>) -> Self {
        self.queues = queues;
        self
    }

    pub fn with_window_proc(self, window_proc: Arc<dyn WindowProc>) -> Self {
        self.set_window_proc(window_proc);
        self
    }

    pub fn set_window_proc(&self, window_proc: Arc<dyn WindowProc>) {
        *self.window_proc.write().unwrap() = window_proc;
    }

    pub fn display(&self) -> &Arc<dyn DisplayConnection> {
        &self.display
    }

    pub fn queues(&self) -> &Arc<QueueRegistry> {
        &self.queues
    }

    /// Create a window owned by the calling thread's queue
    pub fn create_window(&self, params: &CreateParams) -> Result<WindowId> {
        let parent = match params.parent {
            Some(id) => Some(self.parent_link(id)?),
            None => None,
        };
        let owner = match params.owner {
            Some(id) => self.with_window(id, |w| Ok(w.frame()))?,
            None => NativeHandle::NONE,
        };

        let queue = self.queues.current();
        let (id, window) = {
            let mut inner = self.inner.lock().unwrap();
            let id = WindowId(inner.next_id);
            inner.next_id += 1;
            let window = Arc::new(Mutex::new(NativeWindow::new(
                id,
                self.display.clone(),
                queue.clone(),
                self.policy.clone(),
            )));
            inner.windows.insert(
                id,
                Entry {
                    window: window.clone(),
                    queue,
                },
            );
            (id, window)
        };

        let result = self.finish_window(id, &window, params, parent, owner);
        if let Err(e) = result {
            log::warn!("Creating window {} failed: {}", id, e);
            self.forget(id);
            // Destroy whatever did get created
            if let Err(cleanup) = window.lock().unwrap().destroy() {
                log::warn!("Failed to clean up window {}: {}", id, cleanup);
            }
            self.flush();
            return Err(e);
        }
        self.flush();
        Ok(id)
    }

    fn finish_window(
        &self,
        id: WindowId,
        window: &WindowRef,
        params: &CreateParams,
        parent: Option<ParentLink>,
        owner: NativeHandle,
    ) -> Result<()> {
        let messages = {
            let mut w = window.lock().unwrap();
            w.create_handles(params, parent, owner)?;
            {
                let mut inner = self.inner.lock().unwrap();
                inner.handles.insert(w.frame(), id);
                inner.handles.insert(w.client(), id);
            }
            w.finish_create(params)?;
            w.take_messages()
        };
        self.deliver(messages);
        Ok(())
    }

    fn parent_link(&self, id: WindowId) -> Result<ParentLink> {
        self.with_window(id, |w| {
            Ok(ParentLink {
                id,
                frame: w.frame(),
                client: w.client(),
            })
        })
    }

    /// Destroy a window and drop it from the registry
    pub fn destroy_window(&self, id: WindowId) -> Result<()> {
        let window = self.get(id).ok_or(Error::UnknownWindow(id))?;
        let (result, messages) = {
            let mut w = window.lock().unwrap();
            let result = w.destroy();
            (result, w.take_messages())
        };
        self.forget(id);
        self.deliver(messages);
        self.flush();
        result
    }

    /// Drop a window without touching the native side
    pub(crate) fn forget(&self, id: WindowId) {
        let mut inner = self.inner.lock().unwrap();
        if inner.windows.remove(&id).is_some() {
            inner.handles.retain(|_, owner| *owner != id);
            log::debug!("Window {} removed from registry", id);
        }
    }

    pub fn get(&self, id: WindowId) -> Option<WindowRef> {
        let inner = self.inner.lock().unwrap();
        inner.windows.get(&id).map(|e| e.window.clone())
    }

    /// Window owning a native handle, frame or client
    pub fn lookup(&self, handle: NativeHandle) -> Option<WindowId> {
        if handle.is_none() {
            return None;
        }
        self.inner.lock().unwrap().handles.get(&handle).copied()
    }

    /// Queue of the thread that created the window
    pub fn queue_of(&self, id: WindowId) -> Option<Arc<ThreadQueue>> {
        let inner = self.inner.lock().unwrap();
        inner.windows.get(&id).map(|e| e.queue.clone())
    }

    pub fn window_count(&self) -> usize {
        self.inner.lock().unwrap().windows.len()
    }

    /// Run `f` on a locked window, then deliver the messages it produced.
    pub fn with_window<R, F>(&self, id: WindowId, f: F) -> Result<R>
    where
        F: FnOnce(&mut NativeWindow) -> Result<R>,
    {
        let window = self.get(id).ok_or(Error::UnknownWindow(id))?;
        let (result, messages) = {
            let mut w = window.lock().unwrap();
            let result = f(&mut w);
            (result, w.take_messages())
        };
        self.deliver(messages);
        self.flush();
        result
    }

    /// Push buffered requests to the server. Failures surface on the next
    /// call that waits for a reply, so they are only logged here.
    pub fn flush(&self) {
        if let Err(e) = self.display.flush() {
            log::warn!("Failed to flush display: {}", e);
        }
    }

    /// Call the window procedure synchronously.
    ///
    /// A paint the procedure did not consume is dropped afterwards so the
    /// paint list can drain.
    pub fn send_message(&self, id: WindowId, msg: Msg, wparam: usize, lparam: isize) -> isize {
        let window_proc = self.window_proc.read().unwrap().clone();
        let result = window_proc.window_proc(id, msg, wparam, lparam);
        if msg == Msg::PAINT || msg == Msg::NCPAINT {
            if let Some(window) = self.get(id) {
                window.lock().unwrap().validate(msg == Msg::PAINT);
            }
        }
        result
    }

    pub(crate) fn deliver(&self, messages: Vec<Message>) {
        for m in messages {
            self.send_message(m.window, m.msg, m.wparam, m.lparam);
        }
    }

    /// Queue a message for the thread that owns `id`
    pub fn post_message(&self, id: WindowId, msg: Msg, wparam: usize, lparam: isize) -> Result<()> {
        let queue = self.queue_of(id).ok_or(Error::UnknownWindow(id))?;
        queue.enqueue(NativeEvent::Posted(Message::new(id, msg, wparam, lparam)));
        Ok(())
    }

    /// Queue `WM_QUIT` for the calling thread
    pub fn post_quit(&self, exit_code: i32) {
        self.queues.current().enqueue(NativeEvent::Posted(Message::new(
            WindowId::NONE,
            Msg::QUIT,
            exit_code as usize,
            0,
        )));
    }
}

impl fmt::Debug for WindowRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("WindowRegistry")
            .field("windows", &inner.windows.len())
            .field("handles", &inner.handles.len())
            .finish()
    }
}
