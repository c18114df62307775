use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use quill::config::{FileConfig, ServerConfig};
use quill::server::{AppState, create_router};
use quill::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "A small blog server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// SQLite connection string, e.g. "sqlite://quill.db" [env: DATABASE_URL]
    #[arg(long)]
    database_url: Option<String>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// Host to bind to [env: QUILL_HOST]
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to [env: QUILL_PORT]
        #[arg(long, short)]
        port: Option<u16>,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Create the database schema and print a summary
    Init {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Manage accounts
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// List all accounts
    List {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Remove an account together with its posts and comments
    Remove {
        /// Email of the account to remove
        email: String,

        #[command(flatten)]
        store: StoreArgs,
    },
}

/// Defaults, then the config file, then the environment, then flags.
fn load_config(args: &StoreArgs) -> anyhow::Result<ServerConfig> {
    let mut config = ServerConfig::default();

    if let Some(path) = &args.config {
        let file = FileConfig::load(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        config = config.with_file(file);
    }

    let mut config = config.with_env()?;
    if let Some(url) = &args.database_url {
        config.database_url = url.clone();
    }
    Ok(config)
}

fn open_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
    let store = SqliteStore::open(&config.database_url)
        .with_context(|| format!("Failed to open database {}", config.database_url))?;
    store.initialize()?;
    Ok(store)
}

fn run_init(args: &StoreArgs) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let store = open_store(&config)?;
    let stats = store.stats()?;

    println!("Initialized database at {}", config.database_url);
    println!("  users:    {}", stats.users);
    println!("  posts:    {}", stats.posts);
    println!("  comments: {}", stats.comments);

    match store.get_admin()? {
        Some(admin) => println!("  admin:    {} <{}>", admin.name, admin.email),
        None => println!("  admin:    none yet (the first account to register becomes admin)"),
    }

    Ok(())
}

fn run_users(command: UserCommands) -> anyhow::Result<()> {
    match command {
        UserCommands::List { store } => {
            let config = load_config(&store)?;
            let store = open_store(&config)?;

            let users = store.list_users()?;
            if users.is_empty() {
                println!("No users");
                return Ok(());
            }
            for user in users {
                println!("{:>4}  {:<6}  {}  <{}>", user.id, user.role, user.name, user.email);
            }
        }
        UserCommands::Remove { email, store } => {
            let config = load_config(&store)?;
            let store = open_store(&config)?;

            let Some(user) = store.get_user_by_email(&email)? else {
                bail!("No user with email '{email}'");
            };
            if user.is_admin() {
                bail!("Refusing to remove the administrator account");
            }

            store.delete_user(user.id)?;
            info!(user_id = user.id, "Removed user");
            println!("Removed {} <{}>", user.name, user.email);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("quill=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { store } => run_init(&store)?,
        Commands::Users { command } => run_users(command)?,
        Commands::Serve { host, port, store } => {
            let mut config = load_config(&store)?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }

            let state = Arc::new(AppState::from_config(&config)?);
            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
