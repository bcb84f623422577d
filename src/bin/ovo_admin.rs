//! `ovo-admin`: operator commands for reference data, first-run setup and
//! internal service tokens.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use ovo_chat_backend::application::services::{AuthService, AuthServiceImpl};
use ovo_chat_backend::config::Settings;
use ovo_chat_backend::domain::MAX_EVENTS_PER_USER;
use ovo_chat_backend::seeding::{self, AdminOutcome};
use ovo_chat_backend::startup::Providers;
use ovo_chat_backend::telemetry::{self, LogFormat};

#[derive(Debug, Parser)]
#[command(name = "ovo-admin", about = "Administrative tasks for the OVO chat backend", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Event category taxonomy
    Categories {
        #[command(subcommand)]
        action: CategoriesAction,
    },
    /// Sample events for existing users
    Events {
        #[command(subcommand)]
        action: EventsAction,
    },
    /// Summarize users, events and categories
    Verify,
    /// Create collection markers, system stats and the default admin
    Setup {
        /// Remove the collection markers instead
        #[arg(long)]
        cleanup: bool,
    },
    /// Load and validate configuration without starting anything
    CheckConfig,
    /// Sign an internal service token
    IssueToken {
        /// Subject (calling service name)
        #[arg(long)]
        sub: String,
        /// Permission to grant, e.g. `users:read`; repeatable
        #[arg(long = "permission", value_name = "permission")]
        permissions: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
enum CategoriesAction {
    Seed,
    Verify,
    Cleanup,
}

#[derive(Debug, Subcommand)]
enum EventsAction {
    Seed,
    Cleanup,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing_with("warn,ovo_chat_backend=info", LogFormat::from_env());
    let cli = Cli::parse();

    match cli.command {
        Command::CheckConfig => check_config(),
        Command::IssueToken { sub, permissions } => issue_token(&sub, permissions),
        Command::Categories { action } => {
            let (_, providers) = connect()?;
            categories(action, &providers).await
        }
        Command::Events { action } => {
            let (_, providers) = connect()?;
            events(action, &providers).await
        }
        Command::Verify => {
            let (_, providers) = connect()?;
            verify(&providers).await
        }
        Command::Setup { cleanup } => {
            let (settings, providers) = connect()?;
            if cleanup {
                seeding::cleanup_structure(providers.store.as_ref()).await?;
                println!("Structure documents removed");
                Ok(())
            } else {
                setup(&settings, &providers).await
            }
        }
    }
}

fn connect() -> Result<(Settings, Providers)> {
    let settings = Settings::load().context("Invalid configuration")?;
    let providers = Providers::from_settings(&settings)?;
    Ok((settings, providers))
}

async fn categories(action: CategoriesAction, providers: &Providers) -> Result<()> {
    let store = providers.store.as_ref();
    match action {
        CategoriesAction::Seed => {
            let seeded = seeding::seed_categories(store, Utc::now()).await?;
            println!("Seeded {} categories", seeded.len());
            print_categories(&seeding::verify_categories(store).await?);
        }
        CategoriesAction::Verify => print_categories(&seeding::verify_categories(store).await?),
        CategoriesAction::Cleanup => {
            let removed = seeding::cleanup_categories(store).await?;
            println!("Removed {removed} categories");
        }
    }
    Ok(())
}

async fn events(action: EventsAction, providers: &Providers) -> Result<()> {
    let store = providers.store.as_ref();
    match action {
        EventsAction::Seed => {
            let report = seeding::seed_events(store, &mut rand::rng(), Utc::now()).await?;
            println!("Created {} events", report.created.len());
            for (user, count) in &report.per_user {
                println!("  {} ({}): {count}/{MAX_EVENTS_PER_USER} events", user.display_name, user.id);
            }
            for event in report.created.iter().take(5) {
                println!("  + {} - {}/{}", event.event_name, event.category_id, event.subcategory_id);
            }
        }
        EventsAction::Cleanup => {
            let removed = seeding::cleanup_events(store).await?;
            println!("Removed {removed} events");
        }
    }
    Ok(())
}

async fn verify(providers: &Providers) -> Result<()> {
    let overview = seeding::overview(providers.store.as_ref()).await?;
    println!("Users: {}", overview.users);
    println!("Events: {}", overview.events);
    println!("Categories: {}", overview.categories);
    println!("Events per user:");
    for (owner, count) in &overview.events_per_user {
        println!("  {owner}: {count}");
    }
    println!("Events per category:");
    for (category, count) in &overview.events_per_category {
        println!("  {category}: {count}");
    }
    for (i, sample) in overview.samples.iter().enumerate() {
        println!(
            "{}. {} [{}] {} by {}",
            i + 1,
            sample.name,
            sample.category,
            sample.date_time,
            sample.created_by
        );
        match sample.max_attendees {
            Some(max) => println!("   Max attendees: {max}"),
            None => println!("   Max attendees: Unlimited"),
        }
    }
    Ok(())
}

async fn setup(settings: &Settings, providers: &Providers) -> Result<()> {
    let store = providers.store.as_ref();
    let chat = providers.chat.as_ref();
    let now = Utc::now();

    if let Err(e) = seeding::check_connections(store, chat).await.chat {
        bail!("Chat provider unreachable: {e}");
    }
    seeding::setup_collections(store, now).await?;
    println!("Collections set up");

    // Admin creation is optional; a failure does not fail setup.
    match seeding::create_default_admin(providers.identity.as_ref(), store, chat, &settings.admin, now).await {
        Ok(AdminOutcome::Skipped) => println!("Admin credentials not provided, skipped admin creation"),
        Ok(AdminOutcome::Existing(uid)) => println!("Admin user already exists: {uid}"),
        Ok(AdminOutcome::Created(uid)) => println!("Default admin user created: {uid}"),
        Err(e) => tracing::error!(error = %e, "Failed to create admin user"),
    }

    let connections = seeding::check_connections(store, chat).await;
    println!("Document store: {}", status(&connections.document_store));
    println!("Chat provider: {}", status(&connections.chat));
    if !connections.is_ok() {
        bail!("Connection test failed");
    }
    Ok(())
}

fn status(result: &Result<(), String>) -> String {
    match result {
        Ok(()) => "OK".into(),
        Err(e) => format!("FAILED ({e})"),
    }
}

fn print_categories(categories: &[seeding::CategorySummary]) {
    if categories.is_empty() {
        println!("No categories found");
        return;
    }
    println!("Found {} categories:", categories.len());
    for category in categories {
        println!("  - {} (ID: {}) - Active: {}", category.name, category.id, category.is_active);
        if !category.subcategories.is_empty() {
            println!(
                "    {} subcategories: {}",
                category.subcategories.len(),
                category.subcategories.join(", ")
            );
        }
    }
}

fn check_config() -> Result<()> {
    let settings = Settings::load_unchecked().context("Configuration could not be loaded")?;
    println!("environment: {}", settings.environment);
    println!("listen: {}", settings.server_addr());
    println!("providers: {:?}", settings.providers.mode);
    println!("firebase project: {}", settings.firebase.project_id.as_deref().unwrap_or("<unset>"));
    println!("firebase credentials: {}", settings.firebase.has_credentials());
    println!("stream api key set: {}", !settings.stream.api_key.is_empty());
    println!("api keys configured: {}", settings.security.api_keys.len());
    println!("maps key set: {}", settings.platform.google_api_key.is_some());

    settings.validate()?;
    println!("Configuration is valid");
    Ok(())
}

fn issue_token(subject: &str, permissions: Vec<String>) -> Result<()> {
    let settings = Settings::load_unchecked().context("Configuration could not be loaded")?;
    settings.validate()?;

    let issued = AuthServiceImpl::new(settings.jwt).issue_token(subject, permissions)?;
    println!("{}", issued.token);
    eprintln!("expires at {}", issued.expires_at);
    Ok(())
}
