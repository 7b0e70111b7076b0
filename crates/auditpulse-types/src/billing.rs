//! Subscription, referral, and language records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Starter,
    Professional,
    Agency,
}

impl Plan {
    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Starter => "starter",
            Plan::Professional => "professional",
            Plan::Agency => "agency",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starter" => Ok(Plan::Starter),
            "professional" => Ok(Plan::Professional),
            "agency" => Ok(Plan::Agency),
            other => Err(format!(
                "unknown plan '{other}' (expected starter, professional, or agency)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub plan: Plan,
    pub status: String,
    pub audits_per_month: u32,
    pub audits_used_this_month: u32,
    #[serde(default)]
    pub free_months_remaining: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_end: Option<String>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    pub id: String,
    pub referral_code: String,
    pub referred_email: String,
    #[serde(default)]
    pub is_converted: bool,
    #[serde(default)]
    pub reward_granted: bool,
    pub created_at: String,
}

/// A report output language advertised by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageOption {
    pub code: String,
    pub name: String,
}

impl LanguageOption {
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub plan: Plan,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub checkout_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferralRequest {
    pub referred_email: String,
}
