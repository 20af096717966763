//! `nexus`: terminal client for the forum.
//!
//! Registers and signs in users (with national-ID verification), reads and
//! posts to threads, and edits the signed-in profile.

mod commands;
mod output;
mod session_file;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::debug;

use nexus_client::{ClientConfig, HttpForumApi};

#[derive(Parser, Debug)]
#[command(name = "nexus", about = "Forum client", version)]
struct Cli {
    /// Forum API base url (overrides NEXUS_API_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Where the signed-in session is kept.
    #[arg(
        long,
        global = true,
        env = "NEXUS_SESSION_FILE",
        default_value = ".nexus-session.json"
    )]
    session_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// National-ID fields shared by `verify`, `register` and `kps`.
#[derive(clap::Args, Debug, Clone)]
pub struct IdentityArgs {
    /// 11-digit national ID (TC Kimlik No).
    #[arg(long)]
    pub tc_no: String,
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub year_of_birth: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask the forum to verify national-ID details.
    Verify {
        #[command(flatten)]
        identity: IdentityArgs,
    },

    /// Verify identity, then create an account and sign in.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        display_name: String,
        #[command(flatten)]
        identity: IdentityArgs,
        #[arg(long, env = "NEXUS_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign in and store the session.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "NEXUS_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session.
    Logout,

    /// Show the signed-in user.
    Whoami,

    /// Check national-ID details directly against the KPS registry.
    Kps {
        #[command(flatten)]
        identity: IdentityArgs,
        /// Only run the offline checksum.
        #[arg(long)]
        offline: bool,
    },

    /// Thread reading and posting.
    Thread {
        #[command(subcommand)]
        action: ThreadAction,
    },

    /// Profile settings of the signed-in user.
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand, Debug)]
enum ThreadAction {
    /// Print a thread with its messages.
    Show { thread_id: i64 },

    /// Post a message, optionally with an attached file.
    Post {
        thread_id: i64,
        #[arg(default_value = "")]
        text: String,
        /// File to upload and attach.
        #[arg(long)]
        attach: Option<PathBuf>,
        /// Emoji appended after the text.
        #[arg(long)]
        emoji: Vec<String>,
    },

    /// Replace the content of one of your messages.
    Edit {
        thread_id: i64,
        message_id: i64,
        text: String,
    },

    /// Delete one of your messages.
    Delete {
        thread_id: i64,
        message_id: i64,
        /// Skip confirmation.
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Like a message.
    Like { thread_id: i64, message_id: i64 },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// Print the profile as the settings screen shows it.
    Show,

    /// Change profile fields.
    Set {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        /// Image to upload as the cover photo.
        #[arg(long)]
        cover: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nexus=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.api_url {
        config = config.with_api_url(url);
    }
    debug!(api_url = %config.api_url, "Using forum API");

    let api = Arc::new(HttpForumApi::new(&config)?);
    let ctx = commands::Context {
        api,
        config,
        session_file: cli.session_file,
    };

    match cli.command {
        Commands::Verify { identity } => commands::account::verify(&ctx, identity).await?,
        Commands::Register {
            username,
            display_name,
            identity,
            password,
        } => {
            commands::account::register(&ctx, username, display_name, identity, password).await?
        }
        Commands::Login { username, password } => {
            commands::account::login(&ctx, username, password).await?
        }
        Commands::Logout => commands::account::logout(&ctx)?,
        Commands::Whoami => commands::account::whoami(&ctx)?,
        Commands::Kps { identity, offline } => {
            commands::account::kps_check(identity, offline).await?
        }

        Commands::Thread { action } => match action {
            ThreadAction::Show { thread_id } => commands::thread::show(&ctx, thread_id).await?,
            ThreadAction::Post {
                thread_id,
                text,
                attach,
                emoji,
            } => commands::thread::post(&ctx, thread_id, text, attach, emoji).await?,
            ThreadAction::Edit {
                thread_id,
                message_id,
                text,
            } => commands::thread::edit(&ctx, thread_id, message_id, text).await?,
            ThreadAction::Delete {
                thread_id,
                message_id,
                yes,
            } => commands::thread::delete(&ctx, thread_id, message_id, yes).await?,
            ThreadAction::Like {
                thread_id,
                message_id,
            } => commands::thread::like(&ctx, thread_id, message_id).await?,
        },

        Commands::Profile { action } => match action {
            ProfileAction::Show => commands::profile::show(&ctx)?,
            ProfileAction::Set {
                username,
                email,
                bio,
                cover,
            } => commands::profile::set(&ctx, username, email, bio, cover).await?,
        },
    }

    Ok(())
}
