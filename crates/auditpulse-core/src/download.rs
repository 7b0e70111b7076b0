//! User-triggered report downloads.
//!
//! Independent of polling: a slot tracks one audit's download, allows a single
//! request at a time, and keeps its own last error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use auditpulse_types::Audit;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError, AuditArtifact};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DownloadError {
    #[error("A download for this audit is already in progress")]
    InFlight,
    #[error("The report is not available for this audit")]
    Unavailable,
    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct DownloadSlot {
    audit_id: String,
    in_flight: AtomicBool,
    last_error: Mutex<Option<DownloadError>>,
}

/// Clears the in-flight flag however the download ends, including cancellation.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DownloadSlot {
    pub fn new(audit_id: impl Into<String>) -> Self {
        Self {
            audit_id: audit_id.into(),
            in_flight: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    pub fn audit_id(&self) -> &str {
        &self.audit_id
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// The download control is enabled only for audits with a report and no
    /// download already running.
    pub fn can_download(&self, audit: &Audit) -> bool {
        audit.id == self.audit_id && audit.pdf_url.is_some() && !self.is_in_flight()
    }

    pub fn last_error(&self) -> Option<DownloadError> {
        self.errors().clone()
    }

    /// Fetches the report artifact for `audit`.
    ///
    /// # Errors
    /// [`DownloadError::InFlight`] when another download on this slot has not
    /// finished, [`DownloadError::Unavailable`] when the audit has no report,
    /// and [`DownloadError::Api`] when the request fails.
    pub async fn download(
        &self,
        api: &ApiClient,
        audit: &Audit,
    ) -> Result<AuditArtifact, DownloadError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DownloadError::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let result = if audit.id != self.audit_id || audit.pdf_url.is_none() {
            Err(DownloadError::Unavailable)
        } else {
            api.download_audit(&self.audit_id)
                .await
                .map_err(DownloadError::from)
        };

        match &result {
            Ok(artifact) => {
                info!(audit_id = %self.audit_id, filename = %artifact.filename, bytes = artifact.bytes.len(), "report downloaded");
                *self.errors() = None;
            }
            Err(err) => {
                warn!(audit_id = %self.audit_id, error = %err, "report download failed");
                *self.errors() = Some(err.clone());
            }
        }
        result
    }

    fn errors(&self) -> MutexGuard<'_, Option<DownloadError>> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
