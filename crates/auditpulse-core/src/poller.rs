//! Audit status polling.
//!
//! One task per watched audit: fetch, publish the snapshot, sleep, repeat until
//! the audit reaches a terminal status. The task is bound to a view scope through
//! a [`CancellationToken`]; nothing is published once that scope is cancelled.

use std::sync::Arc;
use std::time::Duration;

use auditpulse_types::{AuditDetail, AuditStatus};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ApiError, AuditSource};
use crate::config::PollRetryConfig;
use crate::session::SessionManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Waiting for the session to finish initializing.
    Idle,
    Polling,
    /// The audit reached `completed` or `failed`.
    Terminal(AuditStatus),
    /// Fetching failed and no retry is left.
    Halted,
}

impl PollState {
    /// No further fetch will be made.
    pub fn is_settled(self) -> bool {
        matches!(self, PollState::Terminal(_) | PollState::Halted)
    }
}

/// What a view renders. Each fetch replaces `audit` wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSnapshot {
    pub state: PollState,
    pub audit: Option<AuditDetail>,
    pub last_error: Option<ApiError>,
}

impl PollSnapshot {
    fn idle() -> Self {
        Self {
            state: PollState::Idle,
            audit: None,
            last_error: None,
        }
    }
}

pub struct AuditPoller<S> {
    source: Arc<S>,
    session: Option<Arc<SessionManager>>,
    interval: Duration,
    retry: PollRetryConfig,
}

impl<S: AuditSource> AuditPoller<S> {
    pub fn new(source: Arc<S>, interval: Duration) -> Self {
        Self {
            source,
            session: None,
            interval,
            retry: PollRetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: PollRetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Delays the first fetch until the session is ready and reports
    /// authentication failures to it.
    pub fn with_session(mut self, session: Arc<SessionManager>) -> Self {
        self.session = Some(session);
        self
    }

    /// Starts polling `audit_id` under a child of `scope`.
    pub fn spawn(&self, audit_id: impl Into<String>, scope: &CancellationToken) -> PollHandle {
        let cancel = scope.child_token();
        let (tx, rx) = watch::channel(PollSnapshot::idle());
        let worker = Worker {
            source: Arc::clone(&self.source),
            session: self.session.clone(),
            interval: self.interval,
            retry: self.retry,
            audit_id: audit_id.into(),
            cancel: cancel.clone(),
            tx,
        };
        let task = tokio::spawn(worker.run());
        PollHandle {
            cancel,
            updates: rx,
            task: Some(task),
        }
    }
}

struct Worker<S> {
    source: Arc<S>,
    session: Option<Arc<SessionManager>>,
    interval: Duration,
    retry: PollRetryConfig,
    audit_id: String,
    cancel: CancellationToken,
    tx: watch::Sender<PollSnapshot>,
}

impl<S: AuditSource> Worker<S> {
    async fn run(self) {
        if let Some(session) = &self.session {
            tokio::select! {
                () = self.cancel.cancelled() => return,
                _ = session.wait_ready() => {}
            }
        }
        if !self.publish(|snap| snap.state = PollState::Polling) {
            return;
        }

        let mut failures = 0u32;
        loop {
            let result = tokio::select! {
                () = self.cancel.cancelled() => return,
                result = self.source.fetch_audit(&self.audit_id) => result,
            };

            let delay = match result {
                Ok(detail) => {
                    failures = 0;
                    let status = detail.status;
                    debug!(audit_id = %self.audit_id, %status, "audit polled");
                    let applied = self.publish(|snap| {
                        snap.audit = Some(detail);
                        snap.last_error = None;
                        if status.is_terminal() {
                            snap.state = PollState::Terminal(status);
                        }
                    });
                    if !applied {
                        return;
                    }
                    if status.is_terminal() {
                        info!(audit_id = %self.audit_id, %status, "audit finished");
                        return;
                    }
                    self.interval
                }
                Err(err) => {
                    failures += 1;
                    if let Some(session) = &self.session {
                        session.handle_api_error(&err);
                    }
                    // A rejected request fails the same way on every retry.
                    let halt = err.is_auth_failure()
                        || err.is_client_error()
                        || failures > self.retry.max_attempts;
                    warn!(
                        audit_id = %self.audit_id,
                        error = %err,
                        attempt = failures,
                        halt,
                        "audit poll failed"
                    );
                    let applied = self.publish(|snap| {
                        snap.last_error = Some(err);
                        if halt {
                            snap.state = PollState::Halted;
                        }
                    });
                    if !applied || halt {
                        return;
                    }
                    self.retry.backoff(failures)
                }
            };

            tokio::select! {
                () = self.cancel.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Applies `update` unless the scope was cancelled. Returns whether it ran.
    fn publish(&self, update: impl FnOnce(&mut PollSnapshot)) -> bool {
        self.tx.send_if_modified(|snap| {
            if self.cancel.is_cancelled() {
                return false;
            }
            update(snap);
            true
        })
    }
}

/// Owner side of a running poll. Dropping it cancels the poll.
pub struct PollHandle {
    cancel: CancellationToken,
    updates: watch::Receiver<PollSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn snapshot(&self) -> PollSnapshot {
        self.updates.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot> {
        self.updates.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves with the first settled snapshot, or the last one published if
    /// polling stopped without settling (cancelled).
    pub async fn wait_settled(&mut self) -> PollSnapshot {
        let settled = self
            .updates
            .wait_for(|snap| snap.state.is_settled())
            .await
            .map(|snap| snap.clone());
        match settled {
            Ok(snap) => snap,
            Err(_closed) => self.snapshot(),
        }
    }

    /// Waits for the polling task to exit.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            warn!(error = %err, "poll task ended abnormally");
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
