//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use auditpulse_core::{config, logging};
use auditpulse_types::Plan;
use clap::Parser;

mod app;
mod commands;

use app::App;

#[derive(Parser)]
#[command(name = "auditpulse")]
#[command(version)]
#[command(about = "AuditPulse SEO audits from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Create an account and sign in
    Register(RegisterArgs),
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        /// Password (read from stdin when omitted)
        #[arg(long, env = "AUDITPULSE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out and forget the stored token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Manage your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Create, inspect, and download audits
    Audits {
        #[command(subcommand)]
        command: AuditCommands,
    },
    /// Manage your subscription
    Subscription {
        #[command(subcommand)]
        command: SubscriptionCommands,
    },
    /// Invite others with a referral code
    Referrals {
        #[command(subcommand)]
        command: ReferralCommands,
    },
    /// List the report languages the service can produce
    Languages,
    /// Show or change the interface language
    Locale {
        #[command(subcommand)]
        command: LocaleCommands,
    },
    /// Overview of recent audits and monthly usage
    Dashboard,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Args)]
struct RegisterArgs {
    #[arg(long)]
    email: String,
    /// Password (read from stdin when omitted)
    #[arg(long, env = "AUDITPULSE_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[arg(long)]
    full_name: Option<String>,
    #[arg(long)]
    company_name: Option<String>,
    /// Preferred report language
    #[arg(long, default_value = "en")]
    language: String,
    #[arg(long)]
    referral_code: Option<String>,
}

#[derive(clap::Subcommand)]
enum ProfileCommands {
    /// Update profile fields; omitted fields are left unchanged
    Update {
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        company_name: Option<String>,
        /// Preferred report language (also switches the interface language)
        #[arg(long)]
        language: Option<String>,
    },
}

#[derive(clap::Subcommand)]
enum AuditCommands {
    /// List audits, newest first
    List {
        /// Zero-based page number
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// Request a new audit
    New {
        /// Site to audit
        #[arg(value_name = "URL")]
        url: String,
        #[arg(long)]
        client_name: Option<String>,
        #[arg(long)]
        client_email: Option<String>,
        /// Report output language
        #[arg(long, default_value = "en")]
        language: String,
        /// Keep watching the audit until it finishes
        #[arg(long)]
        watch: bool,
    },
    /// Show an audit and its report
    Show {
        #[arg(value_name = "AUDIT_ID")]
        id: String,
        /// Print the raw JSON resource
        #[arg(long)]
        json: bool,
    },
    /// Follow an audit until it completes or fails (Ctrl-C to stop)
    Watch {
        #[arg(value_name = "AUDIT_ID")]
        id: String,
    },
    /// Save the PDF report of a completed audit
    Download {
        #[arg(value_name = "AUDIT_ID")]
        id: String,
        /// Directory to write the report to
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(clap::Subcommand)]
enum SubscriptionCommands {
    /// Show plan, usage, and billing period
    Show,
    /// Start a checkout for a plan
    Checkout {
        /// starter, professional, or agency
        #[arg(value_name = "PLAN")]
        plan: Plan,
        /// Where the payment page returns after success
        #[arg(long)]
        success_url: Option<String>,
        /// Where the payment page returns when abandoned
        #[arg(long)]
        cancel_url: Option<String>,
    },
    /// Cancel at the end of the current period
    Cancel,
}

#[derive(clap::Subcommand)]
enum ReferralCommands {
    /// List sent referrals
    List,
    /// Send a referral code to an email address
    Create {
        #[arg(value_name = "EMAIL")]
        email: String,
    },
}

#[derive(clap::Subcommand)]
enum LocaleCommands {
    /// Show the active interface language
    Show,
    /// Switch the interface language
    Set {
        #[arg(value_name = "CODE")]
        code: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Config commands must work even when the file is broken.
    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        };
    }

    let config = config::Config::load().context("load config")?;
    let _log_guard = logging::init(&config.log).context("init logging")?;

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli, config).await })
}

async fn dispatch(cli: Cli, config: config::Config) -> Result<()> {
    let app = App::open(config)?;

    match cli.command {
        Commands::Register(args) => {
            commands::auth::register(
                &app,
                commands::auth::RegisterOptions {
                    email: &args.email,
                    password: args.password,
                    full_name: args.full_name,
                    company_name: args.company_name,
                    language: &args.language,
                    referral_code: args.referral_code,
                },
            )
            .await
        }
        Commands::Login { email, password } => {
            commands::auth::login(&app, &email, password).await
        }
        Commands::Logout => commands::auth::logout(&app).await,
        Commands::Whoami => commands::auth::whoami(&app).await,
        Commands::Profile { command } => match command {
            ProfileCommands::Update {
                full_name,
                company_name,
                language,
            } => commands::auth::update_profile(&app, full_name, company_name, language).await,
        },

        Commands::Audits { command } => match command {
            AuditCommands::List { page } => commands::audits::list(&app, page).await,
            AuditCommands::New {
                url,
                client_name,
                client_email,
                language,
                watch,
            } => {
                let id =
                    commands::audits::create(&app, &url, client_name, client_email, &language)
                        .await?;
                if watch {
                    commands::audits::watch(&app, &id).await?;
                }
                Ok(())
            }
            AuditCommands::Show { id, json } => commands::audits::show(&app, &id, json).await,
            AuditCommands::Watch { id } => commands::audits::watch(&app, &id).await,
            AuditCommands::Download { id, out } => {
                commands::audits::download(&app, &id, &out).await
            }
        },

        Commands::Subscription { command } => match command {
            SubscriptionCommands::Show => commands::billing::show(&app).await,
            SubscriptionCommands::Checkout {
                plan,
                success_url,
                cancel_url,
            } => commands::billing::checkout(&app, plan, success_url, cancel_url).await,
            SubscriptionCommands::Cancel => commands::billing::cancel(&app).await,
        },

        Commands::Referrals { command } => match command {
            ReferralCommands::List => commands::billing::referrals(&app).await,
            ReferralCommands::Create { email } => {
                commands::billing::create_referral(&app, &email).await
            }
        },

        Commands::Languages => commands::locale::languages(&app).await,
        Commands::Locale { command } => match command {
            LocaleCommands::Show => commands::locale::show(&app).await,
            LocaleCommands::Set { code } => commands::locale::set(&app, &code).await,
        },

        Commands::Dashboard => commands::dashboard::run(&app).await,

        // Handled in `run` before config is loaded.
        Commands::Config { .. } => Ok(()),
    }
}
