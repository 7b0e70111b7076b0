//! Core AuditPulse client library (API gateway, session, polling, locale, config).

pub mod api;
pub mod config;
pub mod download;
pub mod locale;
pub mod logging;
pub mod poller;
pub mod routes;
pub mod session;
pub mod storage;
