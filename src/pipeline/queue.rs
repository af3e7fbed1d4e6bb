use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};

use crate::models::{ErrorCode, Job, JobError, JobOutcome, JobState, StatusEvent};

/// Executes one job. Returning `Err` or panicking is reported as `E_INTERNAL`.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, job: Job) -> anyhow::Result<JobOutcome>;
}

struct PendingEntry {
    job: Job,
    reply: oneshot::Sender<JobOutcome>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<PendingEntry>,
    running: Option<String>,
    subscribers: Vec<(u64, mpsc::UnboundedSender<StatusEvent>)>,
    next_subscriber_id: u64,
}

impl QueueState {
    fn is_locked(&self) -> bool {
        self.running.is_some() || !self.pending.is_empty()
    }
}

struct QueueInner {
    processor: Arc<dyn JobProcessor>,
    state: Mutex<QueueState>,
    // Mirrors `QueueState::is_locked`; shared by every idle waiter.
    locked_tx: watch::Sender<bool>,
}

impl QueueInner {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Events are sent while the state lock is held so every subscriber sees
    /// the same global order. Subscriber channels are unbounded, so no event
    /// is ever dropped for a live subscriber.
    fn emit(&self, state: &mut QueueState, event: StatusEvent) {
        tracing::debug!(
            job_id = %event.job_id,
            state = ?event.state,
            locked = event.locked,
            "job status"
        );
        state
            .subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    fn sync_locked(&self, state: &QueueState) {
        self.locked_tx.send_replace(state.is_locked());
    }

    /// Claims the running slot for the next pending job, if the slot is free.
    fn start_next(&self, state: &mut QueueState) -> Option<PendingEntry> {
        if state.running.is_some() {
            return None;
        }
        let entry = state.pending.pop_front()?;
        state.running = Some(entry.job.id.clone());
        let locked = state.is_locked();
        self.emit(
            state,
            StatusEvent::transition(&entry.job.id, JobState::Running, locked),
        );
        Some(entry)
    }

    async fn run_processor(&self, job: Job) -> JobOutcome {
        let processor = Arc::clone(&self.processor);
        let job_id = job.id.clone();
        let handle = tokio::spawn(async move { processor.process(job).await });

        match handle.await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                tracing::warn!(job_id = %job_id, "job processor returned an error: {:#}", err);
                JobOutcome::failed(ErrorCode::Internal, err.to_string())
            }
            Err(join_err) => {
                let message = if join_err.is_panic() {
                    let payload = join_err.into_panic();
                    let detail = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    format!("job processor panicked: {}", detail)
                } else {
                    "job processor was cancelled".to_string()
                };
                tracing::error!(job_id = %job_id, "{}", message);
                JobOutcome::failed(ErrorCode::Internal, message)
            }
        }
    }
}

/// Serializes job execution: at most one job runs at a time, in FIFO order.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<QueueInner>,
}

impl JobQueue {
    pub fn new(processor: Arc<dyn JobProcessor>) -> Self {
        let (locked_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(QueueInner {
                processor,
                state: Mutex::new(QueueState::default()),
                locked_tx,
            }),
        }
    }

    /// Admit a job. Never rejects; the returned ticket resolves with its outcome.
    ///
    /// Must be called from within a tokio runtime.
    pub fn enqueue(&self, job: Job) -> JobTicket {
        let (reply, rx) = oneshot::channel();
        let job_id = job.id.clone();

        let next = {
            let mut state = self.inner.lock_state();
            state.pending.push_back(PendingEntry { job, reply });
            let locked = state.is_locked();
            self.inner.emit(
                &mut state,
                StatusEvent::transition(&job_id, JobState::Queued, locked),
            );
            let next = self.inner.start_next(&mut state);
            self.inner.sync_locked(&state);
            next
        };

        if let Some(entry) = next {
            tokio::spawn(drain(Arc::clone(&self.inner), entry));
        }

        JobTicket { job_id, rx }
    }

    /// Remove a job that has not started yet. Returns `false` for unknown,
    /// running or finished jobs.
    pub fn cancel(&self, job_id: &str) -> bool {
        let mut state = self.inner.lock_state();
        let Some(idx) = state.pending.iter().position(|e| e.job.id == job_id) else {
            return false;
        };
        let Some(entry) = state.pending.remove(idx) else {
            return false;
        };

        let outcome = JobOutcome::Failed {
            error: JobError::cancelled(),
        };
        tracing::warn!(job_id = %job_id, "job cancelled before execution");
        let locked = state.is_locked();
        self.inner
            .emit(&mut state, StatusEvent::terminal(job_id, &outcome, locked));
        let _ = entry.reply.send(outcome);
        self.inner.sync_locked(&state);
        true
    }

    /// Subscribe to every status event emitted from now on. Past events are
    /// not replayed.
    pub fn on_status(&self) -> StatusSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.inner.lock_state();
        let id = state.next_subscriber_id;
        state.next_subscriber_id += 1;
        state.subscribers.push((id, tx));
        StatusSubscription {
            id,
            rx,
            queue: Arc::downgrade(&self.inner),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.inner.lock_state().is_locked()
    }

    /// Id of the job currently occupying the running slot.
    #[cfg(test)]
    fn running_job_id(&self) -> Option<String> {
        self.inner.lock_state().running.clone()
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.inner.lock_state().pending.len()
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.inner.lock_state().subscribers.len()
    }

    /// Resolves as soon as no job is running or pending.
    pub async fn wait_for_idle(&self) {
        let mut rx = self.inner.locked_tx.subscribe();
        let _ = rx.wait_for(|locked| !*locked).await;
    }
}

/// Runs `entry` and then every job that becomes eligible after it.
async fn drain(inner: Arc<QueueInner>, mut entry: PendingEntry) {
    loop {
        let PendingEntry { job, reply } = entry;
        let job_id = job.id.clone();
        let outcome = inner.run_processor(job).await;

        let next = {
            let mut state = inner.lock_state();
            state.running = None;
            let locked = state.is_locked();
            inner.emit(&mut state, StatusEvent::terminal(&job_id, &outcome, locked));
            let _ = reply.send(outcome);
            let next = inner.start_next(&mut state);
            inner.sync_locked(&state);
            next
        };

        match next {
            Some(following) => entry = following,
            None => break,
        }
    }
}

/// Pending outcome of an enqueued job.
pub struct JobTicket {
    job_id: String,
    rx: oneshot::Receiver<JobOutcome>,
}

impl JobTicket {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub async fn outcome(self) -> JobOutcome {
        self.rx.await.unwrap_or_else(|_| {
            JobOutcome::failed(ErrorCode::Internal, "job was dropped before completion")
        })
    }
}

/// A live status subscription. Dropping it unsubscribes.
pub struct StatusSubscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<StatusEvent>,
    queue: Weak<QueueInner>,
}

impl StatusSubscription {
    /// Next event, or `None` once the queue is gone.
    pub async fn recv(&mut self) -> Option<StatusEvent> {
        self.rx.recv().await
    }

    /// Next already-buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<StatusEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait for the terminal event of `job_id`.
    pub async fn wait_for_terminal(&mut self, job_id: &str) -> Option<StatusEvent> {
        while let Some(event) = self.recv().await {
            if event.job_id == job_id && event.state.is_terminal() {
                return Some(event);
            }
        }
        None
    }

    pub fn unsubscribe(self) {}
}

impl Drop for StatusSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.queue.upgrade() {
            let id = self.id;
            inner.lock_state().subscribers.retain(|(sub_id, _)| *sub_id != id);
        }
    }
}
