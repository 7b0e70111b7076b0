//! Account command handlers: register, login, logout, profile.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use auditpulse_core::locale::apply_preferred_language;
use auditpulse_core::routes;
use auditpulse_types::{ProfileUpdate, RegisterData, UserProfile};

use crate::cli::app::App;

pub struct RegisterOptions<'a> {
    pub email: &'a str,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub language: &'a str,
    pub referral_code: Option<String>,
}

pub async fn register(app: &App, opts: RegisterOptions<'_>) -> Result<()> {
    if !app.enter(routes::REGISTER).await? {
        return Ok(());
    }
    let password = password_or_prompt(app, opts.password)?;
    let data = RegisterData {
        email: opts.email.trim().to_string(),
        password,
        full_name: non_blank(opts.full_name),
        company_name: non_blank(opts.company_name),
        preferred_language: opts.language.trim().to_string(),
        referral_code: non_blank(opts.referral_code),
    };
    let user = app.session.register(&data).await?;
    println!(
        "{}",
        app.tf("auth.register_success", &[("name", user.display_name())])
    );
    Ok(())
}

pub async fn login(app: &App, email: &str, password: Option<String>) -> Result<()> {
    if !app.enter(routes::LOGIN).await? {
        return Ok(());
    }
    let password = password_or_prompt(app, password)?;
    let user = app.session.sign_in(email, &password).await?;
    println!(
        "{}",
        app.tf("auth.login_success", &[("name", user.display_name())])
    );
    Ok(())
}

pub async fn logout(app: &App) -> Result<()> {
    app.enter(routes::ROOT).await?;
    app.session.logout();
    println!("{}", app.t("auth.logout_success"));
    Ok(())
}

pub async fn whoami(app: &App) -> Result<()> {
    app.enter(routes::ROOT).await?;
    match app.session.current_user() {
        Some(user) => print_user(app, &user),
        None => println!("{}", app.t("auth.not_logged_in")),
    }
    Ok(())
}

pub async fn update_profile(
    app: &App,
    full_name: Option<String>,
    company_name: Option<String>,
    language: Option<String>,
) -> Result<()> {
    if !app.enter(routes::SETTINGS).await? {
        return Ok(());
    }

    let update = ProfileUpdate {
        full_name,
        company_name,
        preferred_language: None,
    };
    if update.is_empty() && language.is_none() {
        bail!("Nothing to update: pass --full-name, --company-name, or --language");
    }

    if !update.is_empty() {
        app.session
            .update_profile(&update)
            .await
            .map_err(|err| app.fail(err))?;
    }
    if let Some(code) = language {
        apply_preferred_language(&app.session, &app.locale, &code).await?;
        println!("{}", app.tf("settings.language_saved", &[("code", &code)]));
    }

    println!("{}", app.t("common.saved"));
    if let Some(user) = app.session.current_user() {
        print_user(app, &user);
    }
    Ok(())
}

fn print_user(app: &App, user: &UserProfile) {
    println!(
        "{}",
        app.tf(
            "auth.signed_in_as",
            &[("name", user.display_name()), ("email", &user.email)]
        )
    );
    if let Some(company) = user.company_name.as_deref().filter(|c| !c.is_empty()) {
        println!("  {company}");
    }
    println!("  {}: {}", app.t("settings.language"), user.preferred_language);
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn password_or_prompt(app: &App, password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    eprint!("{}", app.t("auth.password_prompt"));
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password is required");
    }
    Ok(password)
}
