use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

use mailpix::auth::token_manager::TokenManager;
use mailpix::auth::token_store;
use mailpix::config::{Config, load_config};
use mailpix::photos::google::GooglePhotos;
use mailpix::scheduler::{SchedulerConfig, run_scheduler};
use mailpix::{pipeline, scheduler};

#[derive(Parser)]
#[command(name = "mailpix")]
#[command(
    about = "Pulls photos out of school emails and ships them to a Google Photos album",
    long_about = None
)]
struct Cli {
    /// Path to config.toml (defaults to the per-user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// One pass: scan the mailbox, stage photos, upload them to the album
    Run {
        /// How many days of mail to look back over (default from config)
        #[arg(long)]
        days_back: Option<u32>,

        /// Stage files locally and print their paths, skipping the upload
        #[arg(long, default_value_t = false)]
        skip_upload: bool,
    },

    /// Keep running on an interval: fetch, upload and clean up each cycle
    Daemon {
        /// Minutes between cycles (default from config)
        #[arg(long)]
        interval: Option<u64>,

        #[arg(long)]
        days_back: Option<u32>,
    },

    /// Store the mailbox password in the system keyring
    SetPassword,

    /// Store the Google OAuth client secret in the system keyring
    SetClientSecret {
        #[arg(long)]
        client_id: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.cmd {
        Command::SetPassword => {
            let cfg = load_config(config_path)?;
            eprintln!(
                "Paste mailbox password for {} (end with Ctrl-D):",
                cfg.mailbox.username
            );
            let mut password = String::new();
            std::io::stdin().read_to_string(&mut password)?;
            let password = password.trim();
            token_store::save_mailbox_password(&cfg.mailbox.username, password)?;
            println!("Saved mailbox password for {}", cfg.mailbox.username);
            Ok(())
        }

        Command::SetClientSecret { client_id } => {
            eprintln!("Paste client secret (end with Ctrl-D):");
            let mut secret = String::new();
            std::io::stdin().read_to_string(&mut secret)?;
            let secret = secret.trim();
            token_store::save_client_secret(&client_id, secret)?;
            println!("Saved client secret for client_id {client_id}");
            Ok(())
        }

        Command::Run {
            days_back,
            skip_upload,
        } => {
            let cfg = load_config(config_path)?;
            let days_back = days_back.unwrap_or(cfg.schedule.days_back);

            if skip_upload {
                let files = pipeline::run(&cfg, days_back)?;
                println!("Staged {} file(s):", files.len());
                for file in &files {
                    println!("  {}", file.path.display());
                }
                return Ok(());
            }

            let library = build_library(&cfg)?;
            let uploaded = scheduler::run_once(&cfg, &library, days_back)?;
            println!("Uploaded {uploaded} photo(s)");
            Ok(())
        }

        Command::Daemon {
            interval,
            days_back,
        } => {
            let cfg = load_config(config_path)?;
            let sched = SchedulerConfig {
                interval_minutes: interval.unwrap_or(cfg.schedule.interval_minutes),
                days_back: days_back.unwrap_or(cfg.schedule.days_back),
            };
            let library = build_library(&cfg)?;
            run_scheduler(&cfg, &library, sched)
        }
    }
}

fn build_library(cfg: &Config) -> Result<GooglePhotos> {
    let photos_cfg = cfg
        .photos
        .as_ref()
        .ok_or_else(|| anyhow!("[photos] section missing from config"))?;
    let tokens = TokenManager::from_config(photos_cfg)?;
    GooglePhotos::new(tokens)
}
