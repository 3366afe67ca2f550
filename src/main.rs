use std::collections::HashSet;
use std::fs;
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use linkden::auth::{AuthService, TokenSigner, generate_random_password};
use linkden::config::{AuthConfig, ServerConfig};
use linkden::server::{AppState, create_router};
use linkden::store::{SqliteStore, Store, UnitOfWork};
use linkden::types::{GENERATED_PASSWORD_LENGTH, User};

const SECRET_ENV: &str = "LINKDEN_SECRET";
const ADMIN_USERNAME: &str = "admin";

#[cfg(unix)]
fn set_restrictive_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "linkden")]
#[command(about = "A self-hostable home for your link collections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database and secrets
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Token signing secret. Falls back to LINKDEN_SECRET, then to the
        /// .jwt_secret file in the data directory.
        #[arg(long)]
        secret: Option<String>,

        /// Username granted admin rights (repeatable)
        #[arg(long = "admin", default_value = "admin")]
        admins: Vec<String>,

        /// Default token lifetime in hours
        #[arg(long, default_value = "24")]
        token_ttl_hours: i64,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the data directory (database, signing secret, admin user)
    Init {
        /// Data directory for the database and secrets
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },
}

fn run_init(data_dir: String, non_interactive: bool) -> anyhow::Result<()> {
    let config = ServerConfig {
        data_dir: data_dir.into(),
        ..ServerConfig::default()
    };
    fs::create_dir_all(&config.data_dir)?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    if store.get_user_by_username(ADMIN_USERNAME)?.is_some() {
        bail!(
            "Server already initialized. Admin password file at: {}",
            config.admin_password_path().display()
        );
    }

    if !non_interactive {
        let proceed = inquire::Confirm::new("Initialize linkden in this data directory?")
            .with_default(true)
            .prompt()?;
        if !proceed {
            return Ok(());
        }
    }

    let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    fs::write(config.secret_path(), &secret)?;
    #[cfg(unix)]
    set_restrictive_permissions(&config.secret_path());

    let password = generate_random_password(GENERATED_PASSWORD_LENGTH);
    let admin = User::new(ADMIN_USERNAME, "admin@linkden.local", &password)?;

    let mut work = UnitOfWork::new();
    work.create(admin);
    store.commit(work)?;
    store.close()?;

    fs::write(config.admin_password_path(), &password)?;
    #[cfg(unix)]
    set_restrictive_permissions(&config.admin_password_path());

    println!();
    println!("========================================");
    println!("Admin password (save this, it won't be shown again):");
    println!();
    println!("  {password}");
    println!();
    println!(
        "Password also written to: {}",
        config.admin_password_path().display()
    );
    println!(
        "Signing secret written to: {}",
        config.secret_path().display()
    );
    println!("========================================");
    println!();

    Ok(())
}

/// Secret resolution order: the --secret flag, the LINKDEN_SECRET
/// environment variable, then the file written by `admin init`.
fn resolve_secret(flag: Option<String>, config: &ServerConfig) -> anyhow::Result<String> {
    if let Some(secret) = flag {
        return Ok(secret);
    }

    if let Ok(secret) = std::env::var(SECRET_ENV) {
        if !secret.is_empty() {
            return Ok(secret);
        }
    }

    let path = config.secret_path();
    if path.exists() {
        let secret = fs::read_to_string(&path)?.trim().to_string();
        if !secret.is_empty() {
            return Ok(secret);
        }
    }

    bail!(
        "Server not initialized. Run 'linkden admin init' first to create the database and signing secret."
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("linkden=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => {
                run_init(data_dir, non_interactive)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            secret,
            admins,
            token_ttl_hours,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
            };

            let auth_config = AuthConfig {
                secret: resolve_secret(secret, &config)?,
                admins: admins.into_iter().collect::<HashSet<_>>(),
                token_ttl_hours,
            };

            fs::create_dir_all(&config.data_dir)?;
            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;

            let auth = AuthService::new(
                TokenSigner::new(&auth_config.secret, auth_config.token_ttl_hours),
                auth_config.admins,
            );

            let state = Arc::new(AppState {
                store: Arc::new(store),
                auth,
            });

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
