//! Application context shared by every command: config, session, and locale.

use std::sync::Arc;

use anyhow::{Result, bail};
use auditpulse_core::api::{ApiClient, ApiError};
use auditpulse_core::config::Config;
use auditpulse_core::locale::LocaleResolver;
use auditpulse_core::routes;
use auditpulse_core::session::{MemoryNavigator, Navigator, SessionManager};
use auditpulse_core::storage::{FileStorage, Storage};

pub struct App {
    pub config: Config,
    pub session: Arc<SessionManager>,
    pub locale: LocaleResolver,
}

impl App {
    pub fn open(config: Config) -> Result<Self> {
        let base_url = config.api_base_url()?;
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::open_default());
        let navigator: Arc<dyn Navigator> = Arc::new(MemoryNavigator::new(routes::ROOT));
        let api = ApiClient::new(base_url, Arc::clone(&storage));
        let session = Arc::new(SessionManager::new(api, Arc::clone(&storage), navigator));
        let locale = LocaleResolver::new(storage, &config.default_locale);
        Ok(Self {
            config,
            session,
            locale,
        })
    }

    pub fn api(&self) -> &ApiClient {
        self.session.api()
    }

    pub fn t(&self, key: &str) -> String {
        self.locale.t(key)
    }

    pub fn tf(&self, key: &str, vars: &[(&str, &str)]) -> String {
        self.locale.tf(key, vars)
    }

    /// Restores locale and session, then opens `route` through the guard.
    ///
    /// Returns false when the guard sent the user elsewhere; the command should
    /// stop without doing its work. A redirect to the login view is an error.
    pub async fn enter(&self, route: &str) -> Result<bool> {
        self.locale.restore();
        self.session.initialize().await;

        let landed = self.session.visit(route);
        if landed == route {
            return Ok(true);
        }
        if landed == routes::LOGIN {
            bail!("{}", self.t("common.please_login"));
        }
        println!("{}", self.tf("common.redirecting", &[("path", &landed)]));
        Ok(false)
    }

    /// Converts an API failure into a command error, ending the session first
    /// when the backend rejected the credentials.
    pub fn fail(&self, err: ApiError) -> anyhow::Error {
        self.session.handle_api_error(&err);
        match hint_key(&err) {
            Some(key) => {
                let hint = self.tf(key, &[("url", self.api().base_url())]);
                anyhow::anyhow!("{err}. {hint}")
            }
            None => err.into(),
        }
    }
}

/// String-table key of the advice appended to an API failure, if any.
fn hint_key(err: &ApiError) -> Option<&'static str> {
    if err.is_auth_failure() {
        Some("common.please_login")
    } else if err.is_transport() {
        Some("common.unreachable")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_key() {
        assert_eq!(
            hint_key(&ApiError::from_response(401, "")),
            Some("common.please_login")
        );
        assert_eq!(
            hint_key(&ApiError::new(None, "Request failed: connection refused")),
            Some("common.unreachable")
        );
        assert_eq!(hint_key(&ApiError::from_response(422, "")), None);
        assert_eq!(hint_key(&ApiError::decode(200, "eof")), None);
    }
}
