//! Thread to queue table
//!
//! Queues are created on first lookup. They are only removed by an explicit
//! `release`, so a process that keeps starting UI threads without releasing
//! them grows the table by one entry per thread.

use super::ThreadQueue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
pub struct QueueRegistry {
    queues: Mutex<HashMap<ThreadId, Arc<ThreadQueue>>>,
}

static GLOBAL: OnceLock<QueueRegistry> = OnceLock::new();

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> &'static QueueRegistry {
        GLOBAL.get_or_init(QueueRegistry::new)
    }

    /// Queue for `thread`, created on first use
    pub fn for_thread(&self, thread: ThreadId) -> Arc<ThreadQueue> {
        let mut queues = self.queues.lock().unwrap();
        queues
            .entry(thread)
            .or_insert_with(|| {
                log::debug!("Creating event queue for {:?}", thread);
                Arc::new(ThreadQueue::new(thread))
            })
            .clone()
    }

    /// Queue for the calling thread
    pub fn current(&self) -> Arc<ThreadQueue> {
        self.for_thread(thread::current().id())
    }

    /// Queue for `thread` if one was created
    pub fn get(&self, thread: ThreadId) -> Option<Arc<ThreadQueue>> {
        self.queues.lock().unwrap().get(&thread).cloned()
    }

    /// Forget a thread's queue. Windows still holding it keep it alive; a
    /// later lookup from the same thread creates a fresh one.
    pub fn release(&self, thread: ThreadId) -> Option<Arc<ThreadQueue>> {
        let queue = self.queues.lock().unwrap().remove(&thread);
        if queue.is_some() {
            log::debug!("Released event queue for {:?}", thread);
        }
        queue
    }

    pub fn len(&self) -> usize {
        self.queues.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_thread_same_queue() {
        let registry = QueueRegistry::new();
        let a = registry.current();
        let b = registry.current();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.thread(), thread::current().id());
    }

    #[test]
    fn test_threads_get_distinct_queues() {
        let registry = Arc::new(QueueRegistry::new());
        let main_queue = registry.current();
        let r = registry.clone();
        let other = thread::spawn(move || r.current()).join().unwrap();
        assert!(!Arc::ptr_eq(&main_queue, &other));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_release_then_recreate() {
        let registry = QueueRegistry::new();
        let first = registry.current();
        let released = registry.release(thread::current().id()).unwrap();
        assert!(Arc::ptr_eq(&first, &released));
        assert!(registry.is_empty());
        let second = registry.current();
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
