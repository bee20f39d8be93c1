//! # Outreach CLI
//!
//! Referral outreach campaigns with automatic follow-ups.
//!
//! Usage:
//!   outreach campaign create --company Acme --title "Backend Engineer"
//!   outreach campaign send 1
//!   outreach history 1
//!   outreach scheduler run           # Follow-up loop until Ctrl-C

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use outreach_channels::{FileTemplateRenderer, JsonFilePeopleFinder, SmtpOutreachClient};
use outreach_core::OutreachConfig;
use outreach_core::traits::OutreachClient;
use outreach_core::types::{
    CampaignStatus, Contact, EmailKind, OwnerProfile, RenderedEmail, SendResult,
};
use outreach_scheduler::{OutreachDb, OutreachService, dispatch};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "outreach", version, about = "📬 Referral outreach with automatic follow-ups")]
struct Cli {
    /// Config file (default: ~/.outreach/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage campaigns
    #[command(subcommand)]
    Campaign(CampaignCommand),
    /// Show every email recorded for a campaign
    History { campaign_id: i64 },
    /// Render an email for a contact without sending it
    Preview {
        campaign_id: i64,
        contact_id: i64,
        /// Preview the follow-up instead of the initial email
        #[arg(long)]
        followup: bool,
    },
    /// Manage owner profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Run the follow-up scheduler
    #[command(subcommand)]
    Scheduler(SchedulerCommand),
}

#[derive(Subcommand)]
enum CampaignCommand {
    /// Create a campaign and look up contacts
    Create {
        #[arg(long)]
        company: String,
        #[arg(long)]
        title: String,
        /// Owner user id (default: configured profile owner)
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Send initial emails to every contact
    Send { campaign_id: i64 },
    /// List campaigns
    List {
        #[arg(long)]
        owner: Option<String>,
    },
    /// Per-campaign counters and contact states
    Stats { campaign_id: i64 },
    /// Stop all further sends for a campaign
    Archive { campaign_id: i64 },
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// Create or replace an owner profile
    Set {
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        linkedin: String,
        /// Repeat for up to three skills
        #[arg(long = "skill")]
        skills: Vec<String>,
    },
    /// Show the profile used for an owner
    Show {
        #[arg(long)]
        owner: Option<String>,
    },
}

#[derive(Subcommand)]
enum SchedulerCommand {
    /// Run the follow-up loop until Ctrl-C
    Run,
    /// Run a single follow-up sweep
    Tick,
}

/// Stand-in for commands that never send.
struct SmtpNotConfigured;

#[async_trait]
impl OutreachClient for SmtpNotConfigured {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn send(&self, _contact: &Contact, _email: &RenderedEmail) -> SendResult {
        SendResult::Error("SMTP is not configured".into())
    }
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

fn load_config(path: Option<&PathBuf>) -> Result<OutreachConfig> {
    let config = match path {
        Some(path) => OutreachConfig::load_from(path)?,
        None => OutreachConfig::load()?,
    };
    config.validate()?;
    Ok(config)
}

fn build_service(config: &OutreachConfig, sends: bool) -> Result<OutreachService> {
    let db = OutreachDb::open(&expand_path(&config.database.path))
        .context("opening outreach database")?;

    let client: Arc<dyn OutreachClient> = if sends {
        Arc::new(SmtpOutreachClient::new(&config.smtp).context("configuring SMTP")?)
    } else {
        Arc::new(SmtpNotConfigured)
    };
    let finder = JsonFilePeopleFinder::new(expand_path(&config.people.path), config.people.limit);
    let template_dir = config.templates.dir.as_deref().map(expand_path);
    let renderer = FileTemplateRenderer::from_config(template_dir.as_deref())?;

    Ok(OutreachService::new(
        config,
        Arc::new(db),
        client,
        Arc::new(finder),
        Arc::new(renderer),
    ))
}

fn default_owner(config: &OutreachConfig, owner: Option<String>) -> String {
    owner
        .or_else(|| Some(config.profile.owner_user_id.clone()).filter(|o| !o.is_empty()))
        .unwrap_or_else(|| "default".to_string())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "outreach=debug,outreach_scheduler=debug,outreach_channels=debug"
    } else {
        "outreach=info,outreach_scheduler=info,outreach_channels=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = load_config(cli.config.as_ref())?;
    tracing::debug!("📂 Database: {}", config.database.path);
    let sends = matches!(
        cli.command,
        Command::Campaign(CampaignCommand::Send { .. }) | Command::Scheduler(_)
    );
    let service = build_service(&config, sends)?;

    match cli.command {
        Command::Campaign(cmd) => run_campaign(&service, &config, cmd).await?,
        Command::History { campaign_id } => {
            print_json(&service.list_email_history(campaign_id)?)?;
        }
        Command::Preview {
            campaign_id,
            contact_id,
            followup,
        } => {
            let kind = if followup {
                EmailKind::Followup
            } else {
                EmailKind::Initial
            };
            let contact = service
                .contacts(campaign_id)?
                .into_iter()
                .find(|c| c.id == contact_id)
                .with_context(|| format!("contact {contact_id} not in campaign {campaign_id}"))?;
            let email = service.preview_email(campaign_id, contact_id, kind)?;
            println!("To: {}", contact.email_address);
            println!("Subject: {}", email.subject);
            println!("\n{}\n", "-".repeat(60));
            println!("{}", email.body);
        }
        Command::Profile(ProfileCommand::Set {
            owner,
            name,
            email,
            linkedin,
            skills,
        }) => {
            let profile = OwnerProfile {
                owner_user_id: default_owner(&config, owner),
                name,
                email,
                linkedin,
                skills,
            };
            service.upsert_owner_profile(&profile)?;
            println!("✅ Profile saved for '{}'", profile.owner_user_id);
        }
        Command::Profile(ProfileCommand::Show { owner }) => {
            print_json(&service.owner_profile(&default_owner(&config, owner))?)?;
        }
        Command::Scheduler(SchedulerCommand::Tick) => {
            print_json(&service.tick_now().await?)?;
        }
        Command::Scheduler(SchedulerCommand::Run) => {
            let forwarder = config
                .notify
                .webhook_url
                .clone()
                .map(|url| dispatch::spawn_webhook_forwarder(&service.context().status, url));

            service.start_scheduler().await;
            println!("⏰ Follow-up scheduler running. Press Ctrl-C to stop.");
            tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
            println!("⏹️ Stopping after the current batch...");
            service.stop_scheduler().await;
            print_json(&service.scheduler_status())?;

            if let Some(forwarder) = forwarder {
                forwarder.abort();
            }
        }
    }
    Ok(())
}

async fn run_campaign(
    service: &OutreachService,
    config: &OutreachConfig,
    cmd: CampaignCommand,
) -> Result<()> {
    match cmd {
        CampaignCommand::Create {
            company,
            title,
            owner,
            description,
        } => {
            let owner = default_owner(config, owner);
            let campaign = service
                .create_campaign(&owner, &company, &title, description.as_deref())
                .await?;
            let contacts = service.contacts(campaign.id)?;
            println!(
                "🎯 Campaign {} created: {} @ {} with {} contacts",
                campaign.id,
                campaign.job_title,
                campaign.company,
                contacts.len()
            );
            for c in contacts {
                println!("   [{}] {} <{}> {}", c.id, c.name, c.email_address, c.title);
            }
        }
        CampaignCommand::Send { campaign_id } => {
            let summary = service.send_initial_batch(campaign_id).await?;
            println!(
                "📤 {} sent, {} failed, {} already sent",
                summary.sent, summary.failed, summary.skipped
            );
        }
        CampaignCommand::List { owner } => {
            for c in service.list_campaigns(owner.as_deref())? {
                println!(
                    "[{}] {:<10} {} @ {} ({})",
                    c.id,
                    c.status.as_str(),
                    c.job_title,
                    c.company,
                    c.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        CampaignCommand::Stats { campaign_id } => {
            let stats = service.campaign_stats(campaign_id)?;
            println!("📊 Campaign {campaign_id}");
            println!("   Contacts:         {}", stats.contacts);
            println!(
                "   Initial emails:   {} sent, {} failed",
                stats.initial_sent, stats.initial_failed
            );
            println!(
                "   Follow-ups:       {} sent, {} failed",
                stats.followups_sent, stats.followups_failed
            );
            println!("   In flight:        {}", stats.pending);
            println!("   Follow-up rate:   {:.1}%", stats.followup_rate());
            for (contact, state) in service.contact_states(campaign_id)? {
                println!("   [{}] {:<28} {:?}", contact.id, contact.email_address, state);
            }
        }
        CampaignCommand::Archive { campaign_id } => {
            if service.campaign(campaign_id)?.status == CampaignStatus::Archived {
                bail!("campaign {campaign_id} is already archived");
            }
            service.set_campaign_status(campaign_id, CampaignStatus::Archived)?;
            println!("🗂️ Campaign {campaign_id} archived");
        }
    }
    Ok(())
}
