//! Dashboard view: headline stats and the most recent audits.

use anyhow::Result;
use auditpulse_core::routes;
use auditpulse_types::{Page, average_score};
use tracing::warn;

use super::audits::print_row;
use crate::cli::app::App;

pub async fn run(app: &App) -> Result<()> {
    if !app.enter(routes::DASHBOARD).await? {
        return Ok(());
    }
    let api = app.api();
    let (audits, subscription) = tokio::join!(api.audits(Page::default()), api.subscription());
    let audits = audits.map_err(|err| app.fail(err))?;

    println!("{}", app.t("dashboard.title"));
    match subscription {
        Ok(sub) => {
            let average = average_score(&audits).map_or_else(|| "-".to_string(), |s| s.to_string());
            println!(
                "  {:<28} {}",
                app.t("dashboard.stats.total_audits"),
                audits.len()
            );
            println!("  {:<28} {average}", app.t("dashboard.stats.avg_score"));
            println!("  {:<28} {}", app.t("dashboard.stats.plan"), sub.plan);
            println!(
                "  {:<28} {} / {}",
                app.t("dashboard.stats.usage"),
                sub.audits_used_this_month,
                sub.audits_per_month
            );
        }
        Err(err) => {
            if err.is_auth_failure() {
                return Err(app.fail(err));
            }
            warn!(error = %err, "subscription unavailable, hiding stats");
        }
    }

    println!();
    if audits.is_empty() {
        println!("{}", app.t("dashboard.no_audits"));
    } else {
        for audit in &audits {
            print_row(app, audit);
        }
    }
    Ok(())
}
