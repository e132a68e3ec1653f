//! A fixed size pool of named worker threads fed through an unbounded channel

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::trace;
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("worker pool {0} is closed")]
pub struct PoolClosedError(pub &'static str);

enum PoolMessage<T> {
    Task(T),
    Exit,
}

pub type TaskHandler<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Runs submitted tasks on `concurrency` worker threads. With a concurrency of 1,
/// tasks run strictly one after the other, in submission order.
///
/// Tasks submitted before [`WorkerPool::start`] are queued and picked up once the
/// workers are running.
pub struct WorkerPool<T: Send + 'static> {
    name: &'static str,
    concurrency: usize,
    sender: Sender<PoolMessage<T>>,
    receiver: Receiver<PoolMessage<T>>,
    handler: TaskHandler<T>,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn new(name: &'static str, concurrency: usize, handler: TaskHandler<T>) -> Self {
        assert!(concurrency > 0, "a worker pool needs at least one worker");
        let (sender, receiver) = unbounded();
        Self { name, concurrency, sender, receiver, handler }
    }

    /// Queues a task without waiting for its execution
    pub fn submit(&self, task: T) -> Result<(), PoolClosedError> {
        self.sender.send(PoolMessage::Task(task)).map_err(|_| PoolClosedError(self.name))
    }

    /// Number of queued tasks not yet picked up by a worker
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    pub fn start(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        (0..self.concurrency)
            .map(|i| {
                let pool = self.clone();
                thread::Builder::new()
                    .name(format!("{}-{}", self.name, i))
                    .spawn(move || pool.worker())
                    .unwrap_or_else(|err| panic!("cannot spawn a {} worker: {}", self.name, err))
            })
            .collect()
    }

    /// Asks every worker to exit once the tasks queued so far are processed
    pub fn signal_exit(&self) {
        for _ in 0..self.concurrency {
            let _ = self.sender.send(PoolMessage::Exit);
        }
    }

    fn worker(self: Arc<Self>) {
        while let Ok(msg) = self.receiver.recv() {
            match msg {
                PoolMessage::Task(task) => (self.handler)(task),
                PoolMessage::Exit => break,
            }
        }
        trace!("{} worker exiting", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    #[test]
    fn test_single_worker_runs_tasks_sequentially() {
        let running = Arc::new(AtomicUsize::new(0));
        let max_running = Arc::new(AtomicUsize::new(0));
        let order = Arc::new(Mutex::new(Vec::new()));
        let handler: TaskHandler<u32> = {
            let (running, max_running, order) = (running.clone(), max_running.clone(), order.clone());
            Arc::new(move |task| {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_running.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(2));
                order.lock().push(task);
                running.fetch_sub(1, Ordering::SeqCst);
            })
        };
        let pool = Arc::new(WorkerPool::new("test-pool", 1, handler));
        for task in 0..20 {
            pool.submit(task).unwrap();
        }
        assert_eq!(pool.pending(), 20);

        let handles = pool.start();
        pool.signal_exit();
        handles.into_iter().for_each(|h| h.join().unwrap());

        assert_eq!(max_running.load(Ordering::SeqCst), 1);
        assert_eq!(*order.lock(), (0..20).collect::<Vec<_>>());
        assert_eq!(pool.pending(), 0);
    }

    #[test]
    fn test_all_workers_exit() {
        let processed = Arc::new(AtomicUsize::new(0));
        let handler: TaskHandler<()> = {
            let processed = processed.clone();
            Arc::new(move |_| {
                processed.fetch_add(1, Ordering::SeqCst);
            })
        };
        let pool = Arc::new(WorkerPool::new("test-pool", 4, handler));
        let handles = pool.start();
        assert_eq!(handles.len(), 4);
        for _ in 0..100 {
            pool.submit(()).unwrap();
        }
        pool.signal_exit();
        handles.into_iter().for_each(|h| h.join().unwrap());
        assert_eq!(processed.load(Ordering::SeqCst), 100);
    }
}
