//! CLI command handlers.

pub mod audits;
pub mod auth;
pub mod billing;
pub mod config;
pub mod dashboard;
pub mod locale;
