//! Session manager: authentication state, its transitions, and the route guard.
//!
//! States move `Initializing -> Anonymous | Authenticated` at startup, then
//! between `Anonymous` and `Authenticated` on login/logout. Any failure to
//! validate the stored token ends the session (fail closed).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use auditpulse_types::{LoginData, ProfileUpdate, RegisterData, TokenResponse, UserProfile};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError, ApiResult};
use crate::routes;
use crate::storage::{Storage, TOKEN_KEY};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Anonymous,
    Authenticated(UserProfile),
}

impl SessionState {
    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Initializing)
    }
}

/// Where views are sent. The front end decides what a path means.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
    fn current_path(&self) -> String;
}

/// Navigator that only remembers where it is and every redirect it was given.
pub struct MemoryNavigator {
    inner: Mutex<NavState>,
}

struct NavState {
    current: String,
    history: Vec<String>,
}

impl MemoryNavigator {
    pub fn new(start: &str) -> Self {
        Self {
            inner: Mutex::new(NavState {
                current: start.to_string(),
                history: Vec::new(),
            }),
        }
    }

    /// Every path passed to [`Navigator::navigate`], oldest first.
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    fn lock(&self) -> MutexGuard<'_, NavState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Navigator for MemoryNavigator {
    fn navigate(&self, path: &str) {
        let mut state = self.lock();
        state.current = path.to_string();
        state.history.push(path.to_string());
    }

    fn current_path(&self) -> String {
        self.lock().current.clone()
    }
}

pub struct SessionManager {
    api: ApiClient,
    storage: Arc<dyn Storage>,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    pub fn new(api: ApiClient, storage: Arc<dyn Storage>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            api,
            storage,
            navigator,
            state: watch::Sender::new(SessionState::Initializing),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.state.borrow().user().cloned()
    }

    /// Resolves once startup validation has finished.
    pub async fn wait_ready(&self) -> SessionState {
        let mut rx = self.subscribe();
        match rx.wait_for(|state| !state.is_loading()).await {
            Ok(state) => state.clone(),
            Err(_closed) => self.state(),
        }
    }

    /// Restores the session from the persisted token.
    ///
    /// Only acts while `Initializing`; later calls return the current state.
    pub async fn initialize(&self) -> SessionState {
        if !self.is_loading() {
            return self.state();
        }

        let next = match self.api.token() {
            None => SessionState::Anonymous,
            Some(_) => match self.api.me().await {
                Ok(user) => {
                    info!(user_id = %user.id, "session restored");
                    SessionState::Authenticated(user)
                }
                Err(err) => {
                    warn!(error = %err, status = ?err.status(), "stored token rejected, clearing session");
                    self.clear_token();
                    SessionState::Anonymous
                }
            },
        };
        self.state.send_replace(next.clone());
        next
    }

    /// Records a successful authentication and lands on the dashboard.
    ///
    /// # Errors
    /// Returns an error if the token cannot be persisted; the session stays anonymous.
    pub fn login(&self, token: &str, user: UserProfile) -> Result<()> {
        self.storage.set(TOKEN_KEY, token)?;
        info!(user_id = %user.id, "logged in");
        self.state.send_replace(SessionState::Authenticated(user));
        self.navigator.navigate(routes::DASHBOARD);
        Ok(())
    }

    /// Password login against the backend.
    ///
    /// # Errors
    /// Returns the backend's message on rejected credentials. Nothing is stored then.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<UserProfile> {
        let credentials = LoginData {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        let response = self.api.login(&credentials).await?;
        self.accept(response)
    }

    /// # Errors
    /// Returns the backend's message when registration is rejected.
    pub async fn register(&self, data: &RegisterData) -> Result<UserProfile> {
        let response = self.api.register(data).await?;
        self.accept(response)
    }

    fn accept(&self, response: TokenResponse) -> Result<UserProfile> {
        let user = response.user;
        self.login(&response.access_token, user.clone())?;
        Ok(user)
    }

    /// Clears the token and profile and sends the user to the login view.
    pub fn logout(&self) {
        self.clear_token();
        info!("logged out");
        self.state.send_replace(SessionState::Anonymous);
        self.navigator.navigate(routes::LOGIN);
    }

    /// Re-fetches the profile. A failure invalidates the session.
    ///
    /// # Errors
    /// Returns the fetch error after logging out.
    pub async fn refresh_user(&self) -> ApiResult<UserProfile> {
        match self.api.me().await {
            Ok(user) => {
                self.state
                    .send_replace(SessionState::Authenticated(user.clone()));
                Ok(user)
            }
            Err(err) => {
                warn!(error = %err, "profile refresh failed, ending session");
                self.logout();
                Err(err)
            }
        }
    }

    /// Sends a partial profile update and keeps the cached user in sync.
    ///
    /// # Errors
    /// Returns the backend's message; authentication failures also end the session.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<UserProfile> {
        match self.api.update_me(update).await {
            Ok(user) => {
                self.state
                    .send_replace(SessionState::Authenticated(user.clone()));
                Ok(user)
            }
            Err(err) => {
                self.handle_api_error(&err);
                Err(err)
            }
        }
    }

    /// Ends the session when an API call reports bad credentials.
    ///
    /// Returns true when the error was an authentication failure.
    pub fn handle_api_error(&self, err: &ApiError) -> bool {
        if !err.is_auth_failure() {
            return false;
        }
        if self.api.token().is_some() || self.state.borrow().user().is_some() {
            warn!(status = ?err.status(), "authentication rejected, ending session");
            self.logout();
        }
        true
    }

    /// Redirect the guard would apply to `path`; `None` while initializing.
    ///
    /// Authenticated means both a stored token and a signed-in user; either one
    /// alone counts as signed out.
    pub fn guard(&self, path: &str) -> Option<&'static str> {
        if self.is_loading() {
            return None;
        }
        let signed_in = self.state.borrow().user().is_some() && self.api.token().is_some();
        routes::redirect_for(path, signed_in)
    }

    /// Navigates to `path`, then applies the guard. Returns the final path.
    pub fn visit(&self, path: &str) -> String {
        self.navigator.navigate(path);
        self.enforce_current();
        self.navigator.current_path()
    }

    fn enforce_current(&self) {
        let current = self.navigator.current_path();
        if let Some(target) = self.guard(&current) {
            info!(from = %current, to = target, "route guard redirect");
            self.navigator.navigate(target);
        }
    }

    /// Re-runs the guard on every session change until `cancel` fires.
    pub fn watch_routes(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let session = Arc::clone(self);
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        session.enforce_current();
                    }
                }
            }
        })
    }

    fn clear_token(&self) {
        if let Err(err) = self.storage.remove(TOKEN_KEY) {
            warn!(error = %format!("{err:#}"), "failed to clear stored token");
        }
    }
}
