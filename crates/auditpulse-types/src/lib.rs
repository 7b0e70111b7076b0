//! Wire types shared by the AuditPulse client crates.
//!
//! Field names follow the backend's JSON contract (snake_case).

pub mod audit;
pub mod auth;
pub mod billing;
pub mod stats;
mod time;

pub use audit::{
    AiRecommendations, Audit, AuditDetail, AuditStatus, CreateAuditData, KeywordRow, Level,
    PriorityRecommendation, WeeklyAction,
};
pub use auth::{LoginData, ProfileUpdate, RegisterData, TokenResponse, UserProfile};
pub use billing::{
    CheckoutRequest, CheckoutSession, LanguageOption, Plan, Referral, ReferralRequest,
    Subscription,
};
pub use stats::{Page, ScoreBand, average_score, score_band, usage_percent};
pub use time::format_timestamp;
