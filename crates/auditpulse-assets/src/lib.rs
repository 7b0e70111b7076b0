//! Bundled UI string tables.
//!
//! Tables ship inside the binary; report output languages are fetched from the
//! backend separately and never come from here.

/// Locale code, display name, and raw JSON table for every bundled locale.
pub const LOCALES: &[(&str, &str, &str)] = &[
    ("en", "English", include_str!("../locales/en.json")),
    ("it", "Italiano", include_str!("../locales/it.json")),
];
