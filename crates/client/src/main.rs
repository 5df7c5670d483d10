//! Shelf
//!
//! Terminal file manager for a hosted storage bucket.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use client::config::{default_config_path, Config};
use client::namespace::{format_date, format_file_size, Entry, PathCursor, StoredObject};
use client::platform::Platform;
use client::session::{AuthState, SessionContext, SessionStore, SystemKeychain};
use client::{logging, AppwriteClient, FileBrowser, TuiApp};

/// Shelf - terminal file manager for a hosted storage bucket.
#[derive(Parser, Debug)]
#[command(name = "shelf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log in with email and password
    Login {
        /// Account email
        email: String,

        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account and log in
    Signup {
        /// Display name
        name: String,

        /// Account email
        email: String,

        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Print the URL that starts an OAuth login
    Oauth {
        /// OAuth provider (defaults to auth.oauth_provider)
        #[arg(long)]
        provider: Option<String>,
    },

    /// End the current session
    Logout,

    /// Show the logged-in account
    Whoami,

    /// List a folder
    Ls {
        /// Folder path (root when omitted)
        path: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Upload a file or a folder
    Upload {
        /// Local file or directory
        local: PathBuf,

        /// Destination folder in the bucket
        #[arg(long, value_name = "PATH")]
        to: Option<String>,
    },

    /// Download an object by key
    Download {
        /// Object key
        key: String,

        /// Output file (defaults to the object's name)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the download URL of an object
    Url {
        /// Object key
        key: String,
    },

    /// Delete an object by key
    Rm {
        /// Object key
        key: String,

        /// Skip confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// Browse the bucket interactively
    Browse,

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Session context backed by the system keychain.
type CliSession<P> = SessionContext<P, SystemKeychain>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path)?;
    config.apply_env_overrides();

    // The TUI owns the terminal, so it logs to a file.
    let log_dir = matches!(cli.command, Commands::Browse).then(|| config.log_dir());
    let _log_guard = logging::init(&config.client.log_level, cli.verbose, log_dir.as_deref())?;

    tracing::debug!("Using config file: {:?}", config_path);

    if let Commands::Config(command) = &cli.command {
        return run_config_command(command, &config, &config_path);
    }

    config.validate()?;

    let platform = Arc::new(
        AppwriteClient::new(&config.platform)
            .context("Failed to create platform client")?
            .with_chunk_size(config.upload.chunk_size),
    );
    let session = SessionContext::new(
        Arc::clone(&platform),
        SessionStore::system(&config.platform.project_id),
    );

    match cli.command {
        Commands::Login { email, password } => {
            let password = password_or_prompt(password)?;
            let identity = session.login(&email, &password).await?;
            println!("Logged in as {} <{}>", identity.name, identity.email);
        }
        Commands::Signup {
            name,
            email,
            password,
        } => {
            let password = password_or_prompt(password)?;
            let identity = session.signup(&name, &email, &password).await?;
            println!("Created account {} <{}>", identity.name, identity.email);
        }
        Commands::Oauth { provider } => {
            let provider = provider.unwrap_or_else(|| config.auth.oauth_provider.clone());
            let url = session
                .oauth_url(
                    &provider,
                    &config.auth.oauth_success_url,
                    &config.auth.oauth_failure_url,
                )
                .await?;
            println!("Open this URL in a browser to log in with {}:", provider);
            println!();
            println!("  {}", url);
            println!();
            println!("The session created by the browser stays with the browser.");
        }
        Commands::Logout => {
            session.resolve().await;
            session.logout().await?;
            println!("Logged out.");
        }
        Commands::Whoami => match session.resolve().await {
            AuthState::Authenticated(identity) => {
                println!("{} <{}>", identity.name, identity.email);
                println!("ID: {}", identity.id);
            }
            _ => println!("Not logged in."),
        },
        command => {
            session.require_identity().await?;
            let mut browser = FileBrowser::new(
                platform,
                &config.platform.bucket_id,
                config.upload.max_size,
            );
            run_storage_command(command, &mut browser, &session).await?;
        }
    }

    Ok(())
}

fn run_config_command(
    command: &ConfigCommands,
    config: &Config,
    path: &std::path::Path,
) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            println!("# {}", path.display());
            print!("{}", config.to_toml()?);
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::default().save(path)?;
            println!("Wrote default configuration to {}", path.display());
            println!("Set platform.project_id and platform.bucket_id before use.");
        }
    }
    Ok(())
}

async fn run_storage_command<P: Platform>(
    command: Commands,
    browser: &mut FileBrowser<P>,
    session: &CliSession<P>,
) -> anyhow::Result<()> {
    match command {
        Commands::Ls { path, json } => {
            open_path(browser, path.as_deref()).await?;
            if json {
                print_listing_json(browser)?;
            } else {
                print_listing_table(browser);
            }
        }
        Commands::Upload { local, to } => {
            browser.set_cursor(PathCursor::parse(to.as_deref().unwrap_or("")));
            if local.is_dir() {
                let uploaded = browser.upload_folder(&local).await?;
                for object in &uploaded {
                    println!("Uploaded {}", object.key);
                }
                println!("Total: {} file(s)", uploaded.len());
            } else {
                let object = browser.upload_file(&local).await?;
                println!(
                    "Uploaded {} ({})",
                    object.key,
                    format_file_size(object.size_bytes)
                );
            }
        }
        Commands::Download { key, output } => {
            let object = lookup(browser, &key).await?;
            let dest = output.unwrap_or_else(|| PathBuf::from(object.display_name()));
            let written = browser.download_to(&object.id, &dest).await?;
            println!(
                "Saved {} to {} ({})",
                object.key,
                dest.display(),
                format_file_size(written)
            );
        }
        Commands::Url { key } => {
            let object = lookup(browser, &key).await?;
            println!("{}", browser.download_url(&object.id)?);
        }
        Commands::Rm { key, yes } => {
            let object = lookup(browser, &key).await?;
            if !yes && !confirm(&format!("Delete {}?", object.key))? {
                println!("Aborted.");
                return Ok(());
            }
            browser.delete(&object.id).await?;
            println!("Deleted {}", object.key);
        }
        Commands::Browse => {
            let mut app = TuiApp::new().context("Failed to initialize terminal")?;
            let result = app.run(browser, session).await;
            app.restore()?;
            result.map_err(|e| anyhow::anyhow!("TUI error: {}", e))?;
        }
        other => anyhow::bail!("{:?} does not need the bucket", other),
    }
    Ok(())
}

/// Refresh and move the cursor to `path`.
///
/// A path with nothing below it is still a valid cursor and lists as empty.
async fn open_path<P: Platform>(
    browser: &mut FileBrowser<P>,
    path: Option<&str>,
) -> anyhow::Result<()> {
    browser.refresh().await?;
    browser.set_cursor(PathCursor::parse(path.unwrap_or("")));
    Ok(())
}

/// Refresh and resolve an object key.
async fn lookup<P: Platform>(browser: &mut FileBrowser<P>, key: &str) -> anyhow::Result<StoredObject> {
    browser.refresh().await?;
    let key = key.trim_start_matches('/');
    let object = browser.index().find_by_key(key).cloned()?;
    Ok(object)
}

/// Print the listing under the browser's cursor as an ASCII table.
fn print_listing_table<P: Platform>(browser: &FileBrowser<P>) {
    let listing = browser.listing();
    if listing.is_empty() {
        println!("This folder is empty.");
        return;
    }

    let name_width = listing
        .entries()
        .map(|e| e.name().len() + 1)
        .max()
        .unwrap_or(4)
        .max(4);

    println!(
        "{:<name_width$}  {:>10}  {:<10}  {}",
        "NAME",
        "SIZE",
        "CREATED",
        "ID",
        name_width = name_width
    );
    println!("{}", "-".repeat(name_width + 40));

    for entry in listing.entries() {
        match entry {
            Entry::Folder(name) => println!(
                "{:<name_width$}  {:>10}  {:<10}  {}",
                format!("{}/", name),
                "-",
                "-",
                "-",
                name_width = name_width
            ),
            Entry::File(object) => println!(
                "{:<name_width$}  {:>10}  {:<10}  {}",
                object.display_name(),
                format_file_size(object.size_bytes),
                format_date(&object.created_at),
                object.id,
                name_width = name_width
            ),
        }
    }

    println!();
    println!(
        "Total: {} folder(s), {} file(s)",
        listing.folders.len(),
        listing.files.len()
    );
}

fn print_listing_json<P: Platform>(browser: &FileBrowser<P>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&listing_json(browser))?);
    Ok(())
}

fn listing_json<P: Platform>(browser: &FileBrowser<P>) -> Vec<serde_json::Value> {
    browser
        .listing()
        .entries()
        .map(|entry| match entry {
            Entry::Folder(name) => serde_json::json!({
                "type": "folder",
                "name": name,
                "path": browser.cursor().key_for(name).unwrap_or_else(|_| name.to_string()),
            }),
            Entry::File(object) => serde_json::json!({
                "type": "file",
                "name": object.display_name(),
                "key": object.key,
                "id": object.id,
                "size": object.size_bytes,
                "created_at": object.created_at,
            }),
        })
        .collect()
}

fn password_or_prompt(password: Option<String>) -> anyhow::Result<String> {
    match password {
        Some(password) => Ok(password),
        None => prompt_line("Password: "),
    }
}

fn prompt_line(prompt: &str) -> anyhow::Result<String> {
    eprint!("{}", prompt);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    let answer = prompt_line(&format!("{} [y/N] ", question))?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
