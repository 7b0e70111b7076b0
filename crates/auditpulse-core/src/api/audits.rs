//! `/audits/*` endpoints.

use std::future::Future;
use std::sync::LazyLock;

use auditpulse_types::{Audit, AuditDetail, CreateAuditData, Page};
use regex::Regex;
use reqwest::Method;
use reqwest::header::CONTENT_DISPOSITION;

use super::{ApiClient, ApiError, ApiResult, Body};

static FILENAME_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?i)filename="([^"]+)""#).ok());

/// A downloaded report artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// Anything that can fetch the current snapshot of an audit.
///
/// The poller is generic over this so its timing can be driven without HTTP.
pub trait AuditSource: Send + Sync + 'static {
    fn fetch_audit(&self, id: &str) -> impl Future<Output = ApiResult<AuditDetail>> + Send;
}

impl AuditSource for ApiClient {
    fn fetch_audit(&self, id: &str) -> impl Future<Output = ApiResult<AuditDetail>> + Send {
        self.audit(id)
    }
}

impl ApiClient {
    /// # Errors
    /// Returns the backend's message when the audit is rejected (quota, bad URL).
    pub async fn create_audit(&self, data: &CreateAuditData) -> ApiResult<Audit> {
        self.request(Method::POST, "/audits/", Body::json(data)?)
            .await
    }

    /// # Errors
    /// Fails on transport or authentication errors.
    pub async fn audits(&self, page: Page) -> ApiResult<Vec<Audit>> {
        let path = format!("/audits/?skip={}&limit={}", page.skip, page.limit);
        self.request(Method::GET, &path, Body::Empty).await
    }

    /// # Errors
    /// Fails on transport errors, unknown ids, or undecodable bodies.
    pub async fn audit(&self, id: &str) -> ApiResult<AuditDetail> {
        self.request(Method::GET, &format!("/audits/{id}"), Body::Empty)
            .await
    }

    /// Direct link to the report artifact. Requires the bearer header to fetch.
    pub fn download_url(&self, id: &str) -> String {
        self.url(&format!("/audits/{id}/download"))
    }

    /// Fetches the binary report and the filename suggested by the server.
    ///
    /// # Errors
    /// Fails on transport errors or when the report is not available.
    pub async fn download_audit(&self, id: &str) -> ApiResult<AuditArtifact> {
        let response = self
            .send(Method::GET, &format!("/audits/{id}/download"), Body::Empty)
            .await?;
        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| default_filename(id));
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ApiError::transport(&err))?;
        Ok(AuditArtifact {
            bytes: bytes.to_vec(),
            filename,
        })
    }
}

/// Extracts `filename="..."` from a content-disposition header value.
pub fn filename_from_disposition(disposition: &str) -> Option<String> {
    FILENAME_RE
        .as_ref()?
        .captures(disposition)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn default_filename(id: &str) -> String {
    format!("seo_audit_{id}.pdf")
}
