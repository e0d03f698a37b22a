//! Single-threaded job queues
//!
//! A [`SerialQueue`] owns one named thread that runs submitted jobs one at a
//! time in submission order. The mapper keeps two: the worker, which does all
//! database work, and a completion queue, which runs caller callbacks so they
//! never hold up the worker.

use crate::error::{MapperError, Result};
use futures::channel::oneshot;
use log::{debug, error};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Sending side of a queue, usable from any thread
#[derive(Clone)]
pub(crate) struct QueueHandle {
    name: String,
    sender: mpsc::Sender<Job>,
}

impl QueueHandle {
    pub(crate) fn submit(&self, job: Job) -> Result<()> {
        self.sender
            .send(job)
            .map_err(|_| MapperError::Unclassified(format!("{} queue has stopped", self.name)))
    }
}

/// A queue with its own thread
pub(crate) struct SerialQueue {
    handle: Option<QueueHandle>,
    thread: Option<JoinHandle<()>>,
}

impl SerialQueue {
    pub(crate) fn spawn(name: &str) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let thread_name = name.to_string();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_jobs(&thread_name, receiver))
            .map_err(|e| {
                MapperError::Unclassified(format!("failed to spawn {} thread: {}", name, e))
            })?;

        Ok(Self {
            handle: Some(QueueHandle {
                name: name.to_string(),
                sender,
            }),
            thread: Some(thread),
        })
    }

    pub(crate) fn handle(&self) -> Result<QueueHandle> {
        self.handle
            .clone()
            .ok_or_else(|| MapperError::Unclassified("queue has been shut down".to_string()))
    }

    pub(crate) fn submit(&self, job: Job) -> Result<()> {
        self.handle()?.submit(job)
    }

    /// Run `f` on the queue and block until it returns.
    pub(crate) fn run<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.submit(Box::new(move || {
            let _ = tx.send(f());
        }))?;
        rx.recv()
            .map_err(|_| MapperError::Unclassified("operation did not complete".to_string()))
    }

    /// Queue `f` and return a future for its result.
    pub(crate) fn run_async<R, F>(&self, f: F) -> impl Future<Output = Result<R>>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let submitted = self.submit(Box::new(move || {
            let _ = tx.send(f());
        }));
        async move {
            submitted?;
            rx.await
                .map_err(|_| MapperError::Unclassified("operation did not complete".to_string()))
        }
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain what is queued and exit.
        self.handle.take();
        if let Some(thread) = self.thread.take() {
            if thread.thread().id() != thread::current().id() {
                let _ = thread.join();
            }
        }
    }
}

fn run_jobs(name: &str, receiver: mpsc::Receiver<Job>) {
    debug!("{} started", name);
    while let Ok(job) = receiver.recv() {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!("{}: job panicked", name);
        }
    }
    debug!("{} stopped", name);
}
