//! Audit command handlers: list, create, show, watch, download.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use auditpulse_core::download::{DownloadError, DownloadSlot};
use auditpulse_core::poller::{AuditPoller, PollState};
use auditpulse_core::routes;
use auditpulse_types::{
    AiRecommendations, Audit, AuditDetail, AuditStatus, CreateAuditData, Page, ScoreBand,
    format_timestamp, score_band,
};
use tokio_util::sync::CancellationToken;

use crate::cli::app::App;

pub async fn list(app: &App, page: u32) -> Result<()> {
    if !app.enter(routes::AUDITS).await? {
        return Ok(());
    }
    let page = Page::number(page);
    let audits = app.api().audits(page).await.map_err(|err| app.fail(err))?;
    if audits.is_empty() {
        println!("{}", app.t("dashboard.no_audits"));
        return Ok(());
    }
    for audit in &audits {
        print_row(app, audit);
    }
    if page.has_more(audits.len()) {
        let next = (page.next().skip / page.limit).to_string();
        println!("{}", app.tf("audit.next_page", &[("page", &next)]));
    }
    Ok(())
}

/// Prints one audit as a list row.
pub fn print_row(app: &App, audit: &Audit) {
    let score = audit
        .overall_score
        .filter(|&s| s > 0)
        .map_or_else(|| "-".to_string(), |s| s.to_string());
    println!(
        "{}  {:<10}  {:>3}  {}  {}",
        audit.id,
        status_label(app, audit.status),
        score,
        audit.title(),
        format_timestamp(&audit.created_at)
    );
}

/// Submits a new audit and returns its id.
pub async fn create(
    app: &App,
    url: &str,
    client_name: Option<String>,
    client_email: Option<String>,
    language: &str,
) -> Result<String> {
    if !app.enter(routes::NEW_AUDIT).await? {
        bail!("{}", app.t("common.please_login"));
    }
    let data = CreateAuditData::new(url, client_name, client_email, language);
    let audit = app
        .api()
        .create_audit(&data)
        .await
        .map_err(|err| app.fail(err))?;
    println!(
        "{}",
        app.tf("audit.submitted", &[("id", &audit.id), ("url", &audit.url)])
    );
    Ok(audit.id)
}

pub async fn show(app: &App, id: &str, json: bool) -> Result<()> {
    if !app.enter(&routes::audit_detail(id)).await? {
        return Ok(());
    }
    let detail = app.api().audit(id).await.map_err(|err| app.fail(err))?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&detail).context("serialize audit")?
        );
    } else {
        render_detail(app, &detail);
    }
    Ok(())
}

/// Polls the audit until it settles, printing each status change.
pub async fn watch(app: &App, id: &str) -> Result<()> {
    if !app.enter(&routes::audit_detail(id)).await? {
        return Ok(());
    }

    let source = Arc::new(app.api().clone());
    let poller = AuditPoller::new(source, app.config.poll_interval())
        .with_retry(app.config.poll_retry)
        .with_session(Arc::clone(&app.session));
    let scope = CancellationToken::new();
    let handle = poller.spawn(id, &scope);
    let mut updates = handle.subscribe();

    let mut shown: Option<AuditStatus> = None;
    let last = loop {
        let snapshot = updates.borrow_and_update().clone();
        if let Some(audit) = &snapshot.audit
            && shown != Some(audit.status)
        {
            shown = Some(audit.status);
            println!("{}: {}", audit.title(), status_label(app, audit.status));
            if audit.is_in_progress() {
                println!("  {}", app.t("audit.in_progress"));
            }
        }
        if snapshot.state.is_settled() {
            break snapshot;
        }

        let closed = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                scope.cancel();
                println!("{}", app.tf("audit.stopped", &[("id", id)]));
                return Ok(());
            }
            changed = updates.changed() => changed.is_err(),
        };
        if closed {
            break updates.borrow().clone();
        }
    };
    drop(handle);

    match last.state {
        PollState::Terminal(_) => {
            if let Some(detail) = &last.audit {
                println!();
                render_detail(app, detail);
            }
            Ok(())
        }
        _ => match last.last_error {
            Some(err) if err.is_auth_failure() => {
                bail!("{err}. {}", app.t("common.please_login"))
            }
            Some(err) => bail!(
                "{}",
                app.tf("audit.poll_failed", &[("error", err.message())])
            ),
            None => Ok(()),
        },
    }
}

pub async fn download(app: &App, id: &str, out: &Path) -> Result<()> {
    if !app.enter(&routes::audit_detail(id)).await? {
        return Ok(());
    }
    let detail = app.api().audit(id).await.map_err(|err| app.fail(err))?;
    let slot = DownloadSlot::new(id);
    if !slot.can_download(&detail) {
        bail!("{}", app.t("audit.download_unavailable"));
    }

    let artifact = match slot.download(app.api(), &detail).await {
        Ok(artifact) => artifact,
        Err(DownloadError::Api(err)) => return Err(app.fail(err)),
        Err(DownloadError::Unavailable) => bail!("{}", app.t("audit.download_unavailable")),
        Err(err) => return Err(err.into()),
    };

    // Only the final component of the server-suggested name is trusted.
    let filename = Path::new(&artifact.filename)
        .file_name()
        .map_or_else(|| format!("seo_audit_{id}.pdf"), |name| name.to_string_lossy().into_owned());
    fs::create_dir_all(out).with_context(|| format!("create {}", out.display()))?;
    let target = out.join(filename);
    fs::write(&target, &artifact.bytes)
        .with_context(|| format!("write report to {}", target.display()))?;
    println!(
        "{}",
        app.tf("audit.downloaded", &[("path", &target.display().to_string())])
    );
    Ok(())
}

fn status_label(app: &App, status: AuditStatus) -> String {
    app.t(&format!("audit.status.{}", status.as_str()))
}

fn band_label(app: &App, score: u8) -> String {
    let key = match score_band(score) {
        ScoreBand::Good => "audit.band.good",
        ScoreBand::Fair => "audit.band.fair",
        ScoreBand::Poor => "audit.band.poor",
    };
    app.t(key)
}

/// Full detail view: header, status-specific body, and report sections.
pub fn render_detail(app: &App, detail: &AuditDetail) {
    println!("{}", detail.title());
    println!("  {}", detail.url);
    println!(
        "  {}  {}",
        status_label(app, detail.status),
        format_timestamp(&detail.created_at)
    );

    match detail.status {
        AuditStatus::Pending | AuditStatus::Running => {
            println!("  {}", app.t("audit.in_progress"));
        }
        AuditStatus::Failed => {
            println!("{}", app.t("audit.failed"));
            if let Some(message) = detail.error_message.as_deref() {
                println!("  {message}");
            }
        }
        AuditStatus::Completed => {
            println!();
            for (label, score) in detail.score_summary() {
                println!(
                    "  {:<24} {:>3}  {}",
                    app.t(label),
                    score,
                    band_label(app, score)
                );
            }
            if let Some(recs) = &detail.ai_recommendations {
                render_recommendations(app, recs);
            }
            if detail.pdf_url.is_some() {
                println!();
                println!("{}", app.tf("audit.download_hint", &[("id", &detail.id)]));
            }
        }
    }
}

fn heading(app: &App, key: &str) {
    println!();
    println!("{}", app.t(key));
}

fn render_recommendations(app: &App, recs: &AiRecommendations) {
    if let Some(summary) = &recs.executive_summary {
        heading(app, "audit.executive_summary");
        println!("  {summary}");
    }
    if let Some(items) = recs.priority_recommendations.as_deref().filter(|i| !i.is_empty()) {
        heading(app, "audit.priority_recommendations");
        for (n, item) in items.iter().enumerate() {
            println!(
                "  {}. {} [{}/{}]",
                n + 1,
                item.title,
                item.impact.as_str(),
                item.effort.as_str()
            );
            println!("     {}", item.description);
        }
    }
    if let Some(items) = recs.quick_wins.as_deref().filter(|i| !i.is_empty()) {
        heading(app, "audit.quick_wins");
        for item in items {
            println!("  - {item}");
        }
    }
    if let Some(rows) = recs.keyword_table.as_deref().filter(|r| !r.is_empty()) {
        heading(app, "audit.keywords");
        for row in rows {
            let volume = row
                .search_volume
                .map_or_else(|| "-".to_string(), |v| v.to_string());
            println!(
                "  {:<32} {:>8}  {:<8}  {}",
                row.keyword,
                volume,
                row.difficulty.as_deref().unwrap_or("-"),
                row.intent.as_deref().unwrap_or("-")
            );
        }
    }
    if let Some(items) = recs.content_recommendations.as_deref().filter(|i| !i.is_empty()) {
        heading(app, "audit.content_recommendations");
        for item in items {
            println!("  - {item}");
        }
    }
    if let Some(weeks) = recs.weekly_action_plan.as_deref().filter(|w| !w.is_empty()) {
        heading(app, "audit.weekly_plan");
        for week in weeks {
            println!("  {}", app.tf("audit.week", &[("n", &week.week.to_string())]));
            for task in &week.tasks {
                println!("    - {task}");
            }
        }
    }
    if let Some(strategy) = &recs.long_term_strategy {
        heading(app, "audit.long_term_strategy");
        println!("  {strategy}");
    }
}
