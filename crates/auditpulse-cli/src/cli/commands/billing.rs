//! Subscription and referral command handlers.

use anyhow::{Context, Result};
use auditpulse_core::routes;
use auditpulse_types::{Plan, Subscription, format_timestamp, usage_percent};

use crate::cli::app::App;

pub async fn show(app: &App) -> Result<()> {
    if !app.enter(routes::SETTINGS).await? {
        return Ok(());
    }
    let sub = app
        .api()
        .subscription()
        .await
        .map_err(|err| app.fail(err))?;
    print_subscription(app, &sub);
    Ok(())
}

pub fn print_subscription(app: &App, sub: &Subscription) {
    println!("{}", app.t("settings.subscription"));
    println!(
        "  {}",
        app.tf(
            "settings.plan",
            &[("plan", sub.plan.as_str()), ("status", &sub.status)]
        )
    );
    println!(
        "  {} ({:.0}%)",
        app.tf(
            "settings.usage",
            &[
                ("used", &sub.audits_used_this_month.to_string()),
                ("total", &sub.audits_per_month.to_string()),
            ]
        ),
        usage_percent(sub)
    );
    if let Some(end) = sub.current_period_end.as_deref() {
        println!(
            "  {}",
            app.tf("settings.period_end", &[("date", &format_timestamp(end))])
        );
    }
    if sub.free_months_remaining > 0 {
        println!(
            "  {}",
            app.tf(
                "settings.free_months",
                &[("n", &sub.free_months_remaining.to_string())]
            )
        );
    }
    if sub.cancel_at_period_end {
        println!("  {}", app.t("settings.cancel_at_period_end"));
    }
}

pub async fn checkout(
    app: &App,
    plan: Plan,
    success_url: Option<String>,
    cancel_url: Option<String>,
) -> Result<()> {
    if !app.enter(routes::PRICING).await? {
        return Ok(());
    }
    let origin = app_origin(app.api().base_url())?;
    let success_url =
        success_url.unwrap_or_else(|| format!("{origin}{}?checkout=success", routes::DASHBOARD));
    let cancel_url = cancel_url.unwrap_or_else(|| format!("{origin}{}", routes::PRICING));

    let session = app
        .api()
        .create_checkout(plan, &success_url, &cancel_url)
        .await
        .map_err(|err| app.fail(err))?;
    println!(
        "{}",
        app.tf("pricing.checkout", &[("url", &session.checkout_url)])
    );
    Ok(())
}

/// Scheme, host, and port of the API address, used for checkout return links.
fn app_origin(base_url: &str) -> Result<String> {
    let url = url::Url::parse(base_url).with_context(|| format!("parse {base_url}"))?;
    Ok(url.origin().ascii_serialization())
}

pub async fn cancel(app: &App) -> Result<()> {
    if !app.enter(routes::SETTINGS).await? {
        return Ok(());
    }
    app.api()
        .cancel_subscription()
        .await
        .map_err(|err| app.fail(err))?;
    println!("{}", app.t("settings.subscription_cancelled"));
    Ok(())
}

pub async fn referrals(app: &App) -> Result<()> {
    if !app.enter(routes::SETTINGS).await? {
        return Ok(());
    }
    let referrals = app.api().referrals().await.map_err(|err| app.fail(err))?;
    println!("{}", app.t("settings.referrals"));
    if referrals.is_empty() {
        println!("  {}", app.t("settings.no_referrals"));
        return Ok(());
    }
    for referral in &referrals {
        let state = if referral.is_converted {
            app.t("settings.converted")
        } else {
            app.t("settings.pending")
        };
        println!(
            "  {}  {:<32}  {:<10}  {}",
            referral.referral_code,
            referral.referred_email,
            state,
            format_timestamp(&referral.created_at)
        );
    }
    Ok(())
}

pub async fn create_referral(app: &App, email: &str) -> Result<()> {
    if !app.enter(routes::SETTINGS).await? {
        return Ok(());
    }
    let referral = app
        .api()
        .create_referral(email)
        .await
        .map_err(|err| app.fail(err))?;
    println!(
        "{}",
        app.tf(
            "settings.referral_created",
            &[
                ("code", &referral.referral_code),
                ("email", &referral.referred_email)
            ]
        )
    );
    Ok(())
}
