//! Prayer admin command line
//!
//! Drives the dashboard view-models against the hosted backend.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

use clap::{Parser, Subcommand, ValueEnum};
use prayer_admin_backend::{ModerationBackend, ModerationKind, RestClient};
use prayer_admin_core::{
    Config, DeletionRequest, Error, PreferenceChangeRequest, Result, UpdateDeletionRequest,
};
use prayer_admin_dashboard::{
    AuthGate, AuthOutcome, CardOutcome, ConfirmPrompt, ConnectionHeartbeat, EmailSettingsPanel,
    ModerationQueue, PrayerTypeCache, PrayerTypeManager, RequestKind, ThemeToggle,
    heartbeat::probe_once, prayer_types::MoveDirection,
};
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
};
use tokio::signal;
use tracing::{debug, info};

/// Command line interface for the prayer admin dashboard
#[derive(Parser)]
#[command(
    name = "prayer-admin",
    version = env!("CARGO_PKG_VERSION"),
    about = "Administer prayer requests from the terminal",
    long_about = "Moderate pending requests, manage prayer types and notification settings of the prayer request application."
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides configuration
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable structured JSON logging
    #[arg(long)]
    json: bool,

    /// Admin email used to sign in before running the command
    #[arg(long, env = "PRAYER_ADMIN_EMAIL", global = true)]
    email: Option<String>,

    /// Admin password
    #[arg(long, env = "PRAYER_ADMIN_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Check whether the backend is reachable
    Status {
        /// Keep probing and report every change until Ctrl+C
        #[arg(short, long)]
        watch: bool,
    },

    /// Sign in and report the session
    Login,

    /// Moderate pending requests
    Queue {
        /// Request kind (deletion, update-deletion, preference)
        #[arg(short, long, default_value = "deletion", global = true)]
        kind: ModerationKind,

        /// Queue subcommand
        #[command(subcommand)]
        action: QueueCommands,
    },

    /// Manage prayer types
    Types {
        /// Prayer type subcommand
        #[command(subcommand)]
        action: TypeCommands,
    },

    /// Manage admin email notifications
    Settings {
        /// Settings subcommand
        #[command(subcommand)]
        action: SettingsCommands,
    },

    /// Show the configured theme
    Theme {
        /// Show the other theme instead
        #[arg(long)]
        toggle: bool,
    },
}

/// Moderation queue commands
#[derive(Subcommand)]
enum QueueCommands {
    /// List pending requests
    List,

    /// Approve a request
    Approve {
        /// Request id
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Deny a request
    Deny {
        /// Request id
        #[arg(value_name = "ID")]
        id: String,

        /// Reason shown to the requester
        #[arg(value_name = "REASON")]
        reason: String,
    },
}

/// Prayer type commands
#[derive(Subcommand)]
enum TypeCommands {
    /// List prayer types in display order
    List,

    /// Add a prayer type
    Add {
        /// Name
        #[arg(value_name = "NAME")]
        name: String,

        /// Display order (defaults to the end of the list)
        #[arg(short, long)]
        order: Option<i32>,

        /// Create the type inactive
        #[arg(long)]
        inactive: bool,
    },

    /// Rename a prayer type
    Rename {
        /// Prayer type id
        #[arg(value_name = "ID")]
        id: String,

        /// New name
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Flip the active flag
    Toggle {
        /// Prayer type id
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Swap with the neighbouring type
    Move {
        /// Prayer type id
        #[arg(value_name = "ID")]
        id: String,

        /// Direction
        #[arg(value_enum)]
        direction: Direction,
    },

    /// Delete a prayer type
    Delete {
        /// Prayer type id
        #[arg(value_name = "ID")]
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Settings commands
#[derive(Subcommand)]
enum SettingsCommands {
    /// Show the current settings
    Show,

    /// Add a notification address
    AddEmail {
        /// Address
        #[arg(value_name = "EMAIL")]
        address: String,
    },

    /// Remove a notification address
    RemoveEmail {
        /// Address
        #[arg(value_name = "EMAIL")]
        address: String,
    },

    /// Turn emails about new prayers on or off
    Notify {
        /// Whether to send them
        #[arg(value_name = "ENABLED", action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

/// Reorder direction
#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    /// Towards the start of the list
    Up,
    /// Towards the end of the list
    Down,
}

impl From<Direction> for MoveDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::Up,
            Direction::Down => Self::Down,
        }
    }
}

/// Confirmation read from the terminal
struct StdinPrompt {
    assume_yes: bool,
}

impl ConfirmPrompt for StdinPrompt {
    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        print!("{message} [y/N] ");
        let _ = io::stdout().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Main entry point for the admin CLI
///
/// # Errors
///
/// Returns error if configuration, sign-in or the command fails
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (for development convenience)
    if let Err(e) = dotenvy::dotenv() {
        debug!("Note: .env file not loaded: {e}");
    }

    let cli = Cli::parse();

    let mut config = Config::load_from(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }
    if cli.json {
        config.logging.format = "json".to_string();
    }
    prayer_admin_core::init_logging(&config.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = config.backend.base_url(),
        "Prayer admin starting"
    );

    let client = Arc::new(RestClient::new(&config.backend)?);

    if let Some(email) = &cli.email {
        sign_in(&client, email, cli.password.as_deref().unwrap_or_default()).await?;
    } else if matches!(cli.command, Commands::Login) {
        return Err(Error::validation(
            "email",
            "pass --email or set PRAYER_ADMIN_EMAIL",
        ));
    }

    match cli.command {
        Commands::Status { watch } => show_status(&client, &config, watch).await,
        Commands::Login => Ok(()),
        Commands::Queue { kind, action } => {
            let backend: Arc<dyn ModerationBackend> = client;
            match kind {
                ModerationKind::PrayerDeletion => {
                    run_queue::<DeletionRequest>(backend, action).await
                }
                ModerationKind::UpdateDeletion => {
                    run_queue::<UpdateDeletionRequest>(backend, action).await
                }
                ModerationKind::PreferenceChange => {
                    run_queue::<PreferenceChangeRequest>(backend, action).await
                }
            }
        }
        Commands::Types { action } => run_types(client, action).await,
        Commands::Settings { action } => run_settings(client, action).await,
        Commands::Theme { toggle } => {
            let mut theme = ThemeToggle::new(config.ui.theme);
            if toggle {
                theme.toggle();
            }
            println!("{}", theme.current());
            Ok(())
        }
    }
}

/// Sign in through the auth gate
async fn sign_in(client: &Arc<RestClient>, email: &str, password: &str) -> Result<()> {
    let gate = AuthGate::new(client.clone());
    gate.set_email(email);
    gate.set_password(password);

    match gate.submit().await {
        AuthOutcome::SignedIn(session) => {
            let expires = session
                .expires_at
                .map_or_else(|| "unknown".to_string(), |at| at.to_rfc3339());
            println!(
                "Signed in as {} (expires {expires})",
                session.user_email.as_deref().unwrap_or(email)
            );
            Ok(())
        }
        AuthOutcome::Rejected(message) => Err(Error::Authentication(message)),
        AuthOutcome::Ignored => Err(Error::Other("sign-in already in progress".to_string())),
    }
}

/// Report reachability once, or keep watching
async fn show_status(client: &Arc<RestClient>, config: &Config, watch: bool) -> Result<()> {
    if !watch {
        let up = probe_once(client.as_ref(), &config.heartbeat).await;
        println!("{}", if up { "connected" } else { "unreachable" });
        return Ok(());
    }

    let mut heartbeat = ConnectionHeartbeat::mount(client.clone(), &config.heartbeat);
    let mut changes = heartbeat.subscribe();
    println!("connected (assumed until the first probe)");

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let up = *changes.borrow_and_update();
                println!("{}", if up { "connected" } else { "unreachable" });
            }
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping heartbeat");
                break;
            }
        }
    }

    heartbeat.unmount();
    Ok(())
}

/// Run a queue command for one request kind
async fn run_queue<K: RequestKind>(
    backend: Arc<dyn ModerationBackend>,
    action: QueueCommands,
) -> Result<()> {
    let mut queue = ModerationQueue::<K>::new(backend);
    queue.load().await?;

    let (id, outcome, verb) = match action {
        QueueCommands::List => {
            if queue.is_empty() {
                println!("No pending {} requests", K::KIND.label().to_lowercase());
            }
            for card in queue.cards() {
                println!("[{}]", card.id());
                print!("{}", card.render().to_text());
            }
            return Ok(());
        }
        QueueCommands::Approve { id } => {
            let outcome = queue.approve(&id).await?;
            (id, outcome, "approved")
        }
        QueueCommands::Deny { id, reason } => {
            let outcome = queue.deny(&id, &reason).await?;
            (id, outcome, "denied")
        }
    };

    match outcome {
        CardOutcome::Resolved => {
            println!("Request {id} {verb}");
            Ok(())
        }
        CardOutcome::Ignored => Err(Error::validation(
            "reason",
            "a non-empty reason is required to deny a request",
        )),
        CardOutcome::Failed(message) => Err(Error::Other(message)),
    }
}

/// Run a prayer type command
async fn run_types(client: Arc<RestClient>, action: TypeCommands) -> Result<()> {
    let assume_yes = matches!(action, TypeCommands::Delete { yes: true, .. });
    let mut manager = PrayerTypeManager::new(
        client,
        PrayerTypeCache::shared(),
        Arc::new(StdinPrompt { assume_yes }),
    );
    manager.mount().await?;

    match action {
        TypeCommands::List => {
            for row in manager.render() {
                let state = if row.is_active { "" } else { "  (inactive)" };
                println!("{:>4}  {}{state}  [{}]", row.display_order, row.name, row.id);
            }
            return Ok(());
        }
        TypeCommands::Add {
            name,
            order,
            inactive,
        } => {
            let form = manager.form_mut();
            form.name = name;
            form.display_order = order;
            form.is_active = !inactive;
            manager.submit().await?;
        }
        TypeCommands::Rename { id, name } => {
            manager.start_edit(&id)?;
            manager.form_mut().name = name;
            manager.submit().await?;
        }
        TypeCommands::Toggle { id } => manager.toggle_active(&id).await?,
        TypeCommands::Move { id, direction } => {
            if !manager.reorder(&id, direction.into()).await? {
                println!("Already at the edge of the list");
                return Ok(());
            }
        }
        TypeCommands::Delete { id, .. } => {
            if !manager.delete(&id).await? {
                println!("Cancelled");
                return Ok(());
            }
        }
    }

    if let Some(message) = manager.success() {
        println!("{message}");
    }
    Ok(())
}

/// Run a settings command
async fn run_settings(client: Arc<RestClient>, action: SettingsCommands) -> Result<()> {
    let mut panel = EmailSettingsPanel::new(client);
    panel.load().await?;

    match action {
        SettingsCommands::Show => {
            let settings = panel.settings();
            println!(
                "Email on new prayer: {}",
                if settings.notify_on_new_prayer { "on" } else { "off" }
            );
            if settings.notification_emails.is_empty() {
                println!("No notification addresses");
            }
            for address in &settings.notification_emails {
                println!("  {address}");
            }
            return Ok(());
        }
        SettingsCommands::AddEmail { address } => panel.add_email(&address)?,
        SettingsCommands::RemoveEmail { address } => {
            if !panel.remove_email(&address) {
                return Err(Error::NotFound {
                    resource: format!("notification address {address}"),
                });
            }
        }
        SettingsCommands::Notify { enabled } => panel.set_notify_on_new_prayer(enabled),
    }

    panel.save().await?;
    if let Some(message) = panel.success() {
        println!("{message}");
    }
    Ok(())
}
