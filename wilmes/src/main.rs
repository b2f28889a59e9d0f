//! wilmes - read messages and announcements from a school messaging portal
//!
//! Signs in, prints what was asked for, and always signs out again.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/wilmes/config.toml (~/.config/wilmes/config.toml)
//! - Logs: $XDG_STATE_HOME/wilmes/wilmes.log (~/.local/state/wilmes/wilmes.log)
//!
//! The password is taken from `WILMES_PASSWORD` or asked for interactively.

mod prompt;

use anyhow::{Context, Result};
use clap::Parser;
use wilmes_core::format::DEFAULT_WIDTH;
use wilmes_core::{Config, Connection, HttpSession, Pupil};

/// Environment variable holding the password for non-interactive use.
const PASSWORD_ENV: &str = "WILMES_PASSWORD";

#[derive(Parser)]
#[command(name = "wilmes")]
#[command(about = "Read messages and announcements from a school messaging portal")]
#[command(version)]
struct Args {
    /// Base URL of the portal (defaults to portal.url in the config)
    #[arg(short = 'U', long)]
    url: Option<String>,

    /// Username to log in as (defaults to portal.username, then a prompt)
    #[arg(short, long)]
    username: Option<String>,

    /// Only print the number of new messages per pupil
    #[arg(short, long, conflicts_with_all = ["list", "news"])]
    check_only: bool,

    /// List message headers per pupil
    #[arg(short, long, conflicts_with = "news")]
    list: bool,

    /// List announcements per pupil and print the unread ones in full
    #[arg(short, long)]
    news: bool,

    /// Mirror log events to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = wilmes_core::logging::init(&config.logging, args.verbose)
        .context("failed to initialize logging")?;
    config.validate().context("invalid configuration")?;

    let url = args
        .url
        .clone()
        .or_else(|| config.portal.url.clone())
        .context("no portal URL: pass --url or set portal.url in the config")?;
    let username = match args.username.clone().or_else(|| config.portal.username.clone()) {
        Some(username) => username,
        None => prompt::prompt_line("Username: ")?,
    };
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) => password,
        Err(_) => prompt::prompt_password("Password: ")?,
    };

    tracing::info!(url = %url, username = %username, "wilmes starting");

    let mut connection = Connection::login(&config, &url, &username, &password)
        .await
        .context("failed to log in")?;

    let outcome = run(&mut connection, &args).await;
    let closed = connection.close().await;

    outcome?;
    closed.context("failed to log out")?;
    Ok(())
}

async fn run(connection: &mut Connection<HttpSession>, args: &Args) -> Result<()> {
    let pupils: Vec<Pupil> = connection.pupils().cloned().collect();

    if args.check_only {
        for pupil in &pupils {
            let count = connection.unread_counts().get(&pupil.id).copied().unwrap_or(0);
            println!("{}: {}", pupil.name, count);
        }
    } else if args.list {
        for (n, pupil) in pupils.iter().enumerate() {
            if n != 0 {
                println!();
            }
            println!("Pupil: {}", pupil.name);
            let summaries = connection
                .fetch_message_list(&pupil.id)
                .await
                .with_context(|| format!("failed to list messages of {}", pupil.name))?;
            for summary in summaries {
                println!("{}", summary);
            }
        }
    } else if args.news {
        for (n, pupil) in pupils.iter().enumerate() {
            if n != 0 {
                println!();
            }
            print_announcements(connection, pupil).await?;
        }
    } else {
        let new_messages = connection
            .new_messages()
            .await
            .context("failed to fetch new messages")?;
        for entry in new_messages {
            println!("Pupil: {}", entry.pupil.name);
            println!();
            for message in entry.messages {
                println!("{}", message.to_text(DEFAULT_WIDTH));
                println!();
            }
        }
    }
    Ok(())
}

async fn print_announcements(
    connection: &mut Connection<HttpSession>,
    pupil: &Pupil,
) -> Result<()> {
    println!("Pupil: {}", pupil.name);
    let summaries = connection
        .fetch_announcement_list(&pupil.id)
        .await
        .with_context(|| format!("failed to list announcements of {}", pupil.name))?;
    for summary in &summaries {
        println!("{}", summary);
    }

    for summary in summaries.into_iter().filter(|s| s.is_unread) {
        let announcement = connection
            .fetch_announcement(summary)
            .await
            .context("failed to fetch announcement")?;
        println!();
        println!("{}", announcement.to_text(DEFAULT_WIDTH));
    }
    Ok(())
}
