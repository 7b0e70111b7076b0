//! Interface locale: the active code, its persistence, and string lookup.
//!
//! Bundled UI tables and the backend's report output languages are separate
//! lists. The resolver only knows the bundled tables; the backend list feeds
//! selection controls through [`language_options`].

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;
use auditpulse_assets::LOCALES;
use auditpulse_types::{LanguageOption, ProfileUpdate, UserProfile};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::session::SessionManager;
use crate::storage::{LOCALE_KEY, Storage};

pub const DEFAULT_LOCALE: &str = "en";

/// Resolved strings for one locale, backed by the default table.
#[derive(Clone, Copy)]
pub struct StringTable<'a> {
    primary: Option<&'a Value>,
    fallback: Option<&'a Value>,
}

impl StringTable<'_> {
    /// Looks up a dotted key such as `audit.status.running`.
    ///
    /// Missing keys fall back to the default table, then to the key itself.
    pub fn get(&self, key: &str) -> String {
        self.primary
            .and_then(|table| lookup(table, key))
            .or_else(|| self.fallback.and_then(|table| lookup(table, key)))
            .map_or_else(|| key.to_string(), str::to_string)
    }

    pub fn format(&self, key: &str, vars: &[(&str, &str)]) -> String {
        fmt(&self.get(key), vars)
    }
}

fn lookup<'a>(table: &'a Value, key: &str) -> Option<&'a str> {
    key.split('.')
        .try_fold(table, |node, part| node.get(part))
        .and_then(Value::as_str)
}

/// Replaces `{name}` placeholders with their values. Unknown placeholders stay.
pub fn fmt(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{name}}}"), value)
    })
}

pub struct LocaleResolver {
    storage: Arc<dyn Storage>,
    tables: BTreeMap<&'static str, Value>,
    default_locale: String,
    active: RwLock<String>,
}

impl LocaleResolver {
    /// Parses the bundled tables. `default_locale` must be bundled, otherwise
    /// English is used.
    pub fn new(storage: Arc<dyn Storage>, default_locale: &str) -> Self {
        let tables: BTreeMap<&'static str, Value> = LOCALES
            .iter()
            .filter_map(|(code, _, raw)| match serde_json::from_str(raw) {
                Ok(table) => Some((*code, table)),
                Err(err) => {
                    warn!(locale = code, error = %err, "bundled string table is invalid");
                    None
                }
            })
            .collect();
        let default_locale = if tables.contains_key(default_locale) {
            default_locale.to_string()
        } else {
            DEFAULT_LOCALE.to_string()
        };
        Self {
            storage,
            tables,
            active: RwLock::new(default_locale.clone()),
            default_locale,
        }
    }

    /// Applies the saved locale if it is still bundled, else the default.
    pub fn restore(&self) -> String {
        let code = match self.storage.get(LOCALE_KEY) {
            Some(saved) if self.is_bundled(&saved) => saved,
            Some(saved) => {
                debug!(locale = %saved, "saved locale has no bundled table, using default");
                self.default_locale.clone()
            }
            None => self.default_locale.clone(),
        };
        self.set_active(&code);
        code
    }

    /// Switches and persists the locale. Codes without a bundled table are
    /// recorded as given and read strings from the default table.
    ///
    /// # Errors
    /// Returns an error if the code cannot be persisted; the switch still applies.
    pub fn set_locale(&self, code: &str) -> Result<()> {
        let code = code.trim();
        self.set_active(code);
        info!(locale = code, bundled = self.is_bundled(code), "locale changed");
        self.storage.set(LOCALE_KEY, code)
    }

    pub fn locale(&self) -> String {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn strings(&self) -> StringTable<'_> {
        let active = self.locale();
        StringTable {
            primary: self.tables.get(active.as_str()),
            fallback: self.tables.get(self.default_locale.as_str()),
        }
    }

    pub fn t(&self, key: &str) -> String {
        self.strings().get(key)
    }

    pub fn tf(&self, key: &str, vars: &[(&str, &str)]) -> String {
        self.strings().format(key, vars)
    }

    pub fn is_bundled(&self, code: &str) -> bool {
        self.tables.contains_key(code)
    }

    /// Bundled interface locales with their display names.
    pub fn supported(&self) -> Vec<LanguageOption> {
        LOCALES
            .iter()
            .filter(|(code, _, _)| self.is_bundled(code))
            .map(|(code, name, _)| LanguageOption::new(code, name))
            .collect()
    }

    fn set_active(&self, code: &str) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = code.to_string();
    }
}

/// Languages offered by the audit and settings forms.
///
/// Uses the backend's list, or the bundled locales when it cannot be fetched.
pub async fn language_options(api: &ApiClient) -> Vec<LanguageOption> {
    match api.languages().await {
        Ok(languages) if !languages.is_empty() => languages,
        Ok(_) => bundled_options(),
        Err(err) => {
            warn!(error = %err, "could not load output languages, using bundled list");
            bundled_options()
        }
    }
}

fn bundled_options() -> Vec<LanguageOption> {
    LOCALES
        .iter()
        .map(|(code, name, _)| LanguageOption::new(code, name))
        .collect()
}

/// Saves the preferred report language on the profile, then switches the
/// interface locale to it. A rejected update leaves the locale untouched.
///
/// # Errors
/// Returns the profile update error, or a persistence error for the locale.
pub async fn apply_preferred_language(
    session: &SessionManager,
    locale: &LocaleResolver,
    code: &str,
) -> Result<UserProfile> {
    let update = ProfileUpdate {
        preferred_language: Some(code.trim().to_string()),
        ..ProfileUpdate::default()
    };
    let updated = session.update_profile(&update).await?;
    locale.set_locale(code)?;
    Ok(updated)
}
