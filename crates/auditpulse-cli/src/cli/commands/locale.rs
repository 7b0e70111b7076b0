//! Interface and report language command handlers.

use anyhow::Result;
use auditpulse_core::locale::language_options;
use auditpulse_core::routes;
use tracing::warn;

use crate::cli::app::App;

pub async fn show(app: &App) -> Result<()> {
    app.enter(routes::ROOT).await?;
    let active = app.locale.locale();
    println!("{}", app.tf("locale.current", &[("code", &active)]));
    println!("{}", app.t("locale.available"));
    for option in app.locale.supported() {
        let marker = if option.code == active { '*' } else { ' ' };
        println!("{marker} {:<4} {}", option.code, option.name);
    }
    Ok(())
}

pub async fn set(app: &App, code: &str) -> Result<()> {
    app.enter(routes::ROOT).await?;
    app.locale.set_locale(code)?;
    if !app.locale.is_bundled(code.trim()) {
        warn!(locale = code, "no bundled strings for locale, using default");
    }
    println!("{}", app.tf("locale.changed", &[("code", code.trim())]));
    Ok(())
}

/// Report output languages, falling back to the bundled list offline.
pub async fn languages(app: &App) -> Result<()> {
    app.enter(routes::ROOT).await?;
    println!("{}", app.t("settings.language"));
    for option in language_options(app.api()).await {
        println!("  {:<4} {}", option.code, option.name);
    }
    Ok(())
}
