//! Deferred host jobs.
//!
//! Host state may only be mutated on the host tick thread. Anything that
//! runs elsewhere (message handlers, capture tasks) posts a job through a
//! [`DeferredHandle`]; the host runs the queue with
//! [`DeferredQueue::run_pending`] once per tick.

use log::{debug, warn};
use tokio::sync::mpsc;

type Job<H> = Box<dyn FnOnce(&mut H) + Send>;

pub struct DeferredQueue<H> {
    tx: mpsc::UnboundedSender<Job<H>>,
    rx: mpsc::UnboundedReceiver<Job<H>>,
}

/// Thread-safe posting end of a [`DeferredQueue`].
pub struct DeferredHandle<H> {
    tx: mpsc::UnboundedSender<Job<H>>,
}

impl<H> Clone for DeferredHandle<H> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<H> Default for DeferredQueue<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> DeferredQueue<H> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn handle(&self) -> DeferredHandle<H> {
        DeferredHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Run the jobs queued before this call, in posting order.
    ///
    /// Jobs posted while running wait for the next call.
    pub fn run_pending(&mut self, host: &mut H) -> usize {
        let queued = self.rx.len();
        let mut ran = 0;
        while ran < queued {
            match self.rx.try_recv() {
                Ok(job) => {
                    job(host);
                    ran += 1;
                }
                Err(_) => break,
            }
        }
        if ran > 0 {
            debug!("Ran {} deferred host job(s)", ran);
        }
        ran
    }
}

impl<H> DeferredHandle<H> {
    /// Queue `job` for the next host tick. Returns `false` if the queue is gone.
    pub fn post(&self, job: impl FnOnce(&mut H) + Send + 'static) -> bool {
        let posted = self.tx.send(Box::new(job)).is_ok();
        if !posted {
            warn!("Deferred job dropped: host queue is closed");
        }
        posted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Host {
        log: Vec<&'static str>,
    }

    #[test]
    fn test_jobs_run_in_posting_order() {
        let mut queue = DeferredQueue::<Host>::new();
        let handle = queue.handle();
        handle.post(|h| h.log.push("first"));
        handle.clone().post(|h| h.log.push("second"));

        let mut host = Host::default();
        assert_eq!(queue.pending(), 2);
        assert_eq!(queue.run_pending(&mut host), 2);
        assert_eq!(host.log, vec!["first", "second"]);
        assert_eq!(queue.run_pending(&mut host), 0);
    }

    #[test]
    fn test_nothing_runs_until_the_host_ticks() {
        let queue = DeferredQueue::<Host>::new();
        queue.handle().post(|h| h.log.push("later"));
        assert_eq!(queue.pending(), 1);
    }

    #[tokio::test]
    async fn test_post_from_another_thread() {
        let mut queue = DeferredQueue::<Host>::new();
        let handle = queue.handle();
        tokio::task::spawn_blocking(move || handle.post(|h| h.log.push("remote")))
            .await
            .unwrap();
        let mut host = Host::default();
        queue.run_pending(&mut host);
        assert_eq!(host.log, vec!["remote"]);
    }

    #[test]
    fn test_post_after_queue_dropped() {
        let queue = DeferredQueue::<Host>::new();
        let handle = queue.handle();
        drop(queue);
        assert!(!handle.post(|h| h.log.push("lost")));
    }
}
