//! identity-store CLI: `idstore` command.
//!
//! Inspects and edits a file-backed identity store: registered emails,
//! per-site data, login state, device trust, and the staged return target.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use identity_store::{IdentityRef, KeyMaterial, LocalStorage, StoreConfig, TrustState};

// ── Argument helpers ──────────────────────────────────────────────────────────

/// A numeric argument is an identity id; anything else is an email.
fn parse_identity(s: &str) -> IdentityRef {
    match s.parse::<u64>() {
        Ok(id) => IdentityRef::Id(id),
        Err(_) => IdentityRef::Email(s.to_string()),
    }
}

/// Values are JSON when they parse as JSON, plain strings otherwise.
fn parse_value(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{text}");
    Ok(())
}

fn print_optional(value: Option<impl std::fmt::Display>) {
    match value {
        Some(v) => println!("{v}"),
        None => println!("(none)"),
    }
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// identity-store CLI: inspect and edit local identity storage.
#[derive(Parser, Debug)]
#[command(
    name = "idstore",
    about = "identity-store CLI",
    version,
    long_about = "idstore: identity-store CLI\n\nInspect and edit local identity storage: emails and key material,\nsite associations, login state, and device trust."
)]
struct Cli {
    /// Storage directory (default: $IDSTORE_DIR or ~/.identity-store)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage registered emails
    Email {
        #[command(subcommand)]
        subcommand: EmailCommands,
    },

    /// Manage per-site info
    Site {
        #[command(subcommand)]
        subcommand: SiteCommands,
    },

    /// Manage login state
    Login {
        #[command(subcommand)]
        subcommand: LoginCommands,
    },

    /// Manage device trust
    Trust {
        #[command(subcommand)]
        subcommand: TrustCommands,
    },

    /// Manage the email to identity map
    Map {
        #[command(subcommand)]
        subcommand: MapCommands,
    },

    /// Stage or read the return target
    ReturnTo {
        #[command(subcommand)]
        subcommand: ReturnToCommands,
    },

    /// Manage-page settings
    Manage {
        #[command(subcommand)]
        subcommand: ManageCommands,
    },

    /// The remembered sign-in email
    SignInEmail {
        #[command(subcommand)]
        subcommand: SignInEmailCommands,
    },

    /// Forget emails, site info and manage-page settings
    Clear,
}

#[derive(Subcommand, Debug)]
enum EmailCommands {
    /// Register an email (replaces existing key material)
    Add {
        email: String,
        /// Public key (JSON or string)
        #[arg(long = "pub")]
        public_key: Option<String>,
        /// Private key (JSON or string)
        #[arg(long = "priv")]
        secret_key: Option<String>,
        /// Certificate
        #[arg(long)]
        cert: Option<String>,
    },
    /// List registered emails
    List,
    /// Show key material for an email
    Show { email: String },
    /// Remove an email and every reference to it
    Remove { email: String },
    /// Drop the keys of an email but keep it registered
    Invalidate { email: String },
}

#[derive(Subcommand, Debug)]
enum SiteCommands {
    /// Set a field for a site
    Set {
        site: String,
        key: String,
        value: String,
    },
    /// Read a field for a site
    Get { site: String, key: String },
    /// Remove a field for a site
    Remove { site: String, key: String },
    /// Number of sites with stored info
    Count,
    /// Dump all site info
    List,
}

#[derive(Subcommand, Debug)]
enum LoginCommands {
    /// Mark an origin logged in (omit the email to log out)
    Set {
        origin: String,
        email: Option<String>,
    },
    /// Email logged in at an origin
    Get { origin: String },
    /// Number of origins logged in
    Count,
    /// Log out of every origin
    LogoutAll,
    /// Print the login state of an origin whenever another process changes it
    Watch {
        origin: String,
        /// Exit after this many changes
        #[arg(long)]
        count: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
enum TrustCommands {
    /// Show the trust record and whether to ask
    Status { identity: String },
    /// Record a sighting
    Seen { identity: String },
    /// Record "this is my computer"
    Confirm { identity: String },
    /// Record "this is not my computer"
    Deny { identity: String },
    /// Apply a named state (seen, confirmed, denied)
    Set { identity: String, state: String },
    /// Force a prompt on the next check
    ForceAsk { identity: String },
    /// Forget the trust record
    Clear { identity: String },
}

#[derive(Subcommand, Debug)]
enum MapCommands {
    /// Map emails to a numeric identity
    Update {
        user_id: u64,
        #[arg(required = true)]
        emails: Vec<String>,
    },
    /// Resolve an email (or id) to a numeric identity
    Resolve { identity: String },
}

#[derive(Subcommand, Debug)]
enum ReturnToCommands {
    /// Stage a URL
    Set { url: String },
    /// Read the staged URL if still fresh
    Get,
}

#[derive(Subcommand, Debug)]
enum ManageCommands {
    /// Set a field
    Set { key: String, value: String },
    /// Read a field
    Get { key: String },
    /// Remove a field
    Remove { key: String },
}

#[derive(Subcommand, Debug)]
enum SignInEmailCommands {
    /// Remember an email
    Set { email: String },
    /// Show the remembered email
    Get,
    /// Forget the remembered email
    Remove,
}

// ── Main entry point ──────────────────────────────────────────────────────────

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let result = open_storage(cli.dir, cli.verbose)
        .and_then(|storage| run(&storage, cli.command, cli.verbose));

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn open_storage(dir: Option<PathBuf>, verbose: bool) -> Result<LocalStorage> {
    let mut config = StoreConfig::from_env();
    if let Some(dir) = dir {
        config = config.with_dir(dir);
    }
    if verbose {
        match &config.dir {
            Some(dir) => eprintln!("storage: {}", dir.display()),
            None => eprintln!("storage: in-memory"),
        }
    }
    log::debug!("opening storage with {config:?}");
    LocalStorage::open(&config).context("failed to open storage")
}

fn run(storage: &LocalStorage, command: Commands, verbose: bool) -> Result<()> {
    match command {
        Commands::Email { subcommand } => cmd_email(storage, subcommand),
        Commands::Site { subcommand } => cmd_site(storage, subcommand),
        Commands::Login { subcommand } => cmd_login(storage, subcommand),
        Commands::Trust { subcommand } => cmd_trust(storage, subcommand, verbose),
        Commands::Map { subcommand } => cmd_map(storage, subcommand),
        Commands::ReturnTo { subcommand } => cmd_return_to(storage, subcommand),
        Commands::Manage { subcommand } => cmd_manage(storage, subcommand),
        Commands::SignInEmail { subcommand } => cmd_sign_in_email(storage, subcommand),
        Commands::Clear => {
            storage.clear().context("failed to clear storage")?;
            println!("Cleared emails, site info and manage-page settings");
            Ok(())
        }
    }
}

// ── Command implementations ───────────────────────────────────────────────────

/// `idstore email ...`
fn cmd_email(storage: &LocalStorage, subcommand: EmailCommands) -> Result<()> {
    let emails = storage.emails();
    match subcommand {
        EmailCommands::Add {
            email,
            public_key,
            secret_key,
            cert,
        } => {
            let mut material = KeyMaterial::new();
            if let Some(key) = public_key {
                material = material.with_public_key(parse_value(&key));
            }
            if let Some(key) = secret_key {
                material = material.with_secret_key(parse_value(&key));
            }
            if let Some(cert) = cert {
                material = material.with_cert(cert);
            }
            emails.add_email(&email, Some(material))?;
            println!("Added {email}");
        }
        EmailCommands::List => {
            let all = emails.emails()?;
            if all.is_empty() {
                println!("No emails registered");
                return Ok(());
            }
            println!("{:<40} KEYS", "EMAIL");
            println!("{}", "-".repeat(48));
            for (email, material) in &all {
                let keys = if material.has_keys() { "yes" } else { "no" };
                println!("{email:<40} {keys}");
            }
        }
        EmailCommands::Show { email } => {
            let material = emails
                .email(&email)?
                .ok_or_else(|| anyhow!("unknown email address: {email}"))?;
            print_json(&material)?;
        }
        EmailCommands::Remove { email } => {
            emails.remove_email(&email)?;
            println!("Removed {email}");
        }
        EmailCommands::Invalidate { email } => {
            emails.invalidate_email(&email)?;
            println!("Invalidated keys for {email}");
        }
    }
    Ok(())
}

/// `idstore site ...`
fn cmd_site(storage: &LocalStorage, subcommand: SiteCommands) -> Result<()> {
    let sites = storage.sites();
    match subcommand {
        SiteCommands::Set { site, key, value } => {
            sites.set(&site, &key, parse_value(&value))?;
        }
        SiteCommands::Get { site, key } => print_optional(sites.get(&site, &key)?),
        SiteCommands::Remove { site, key } => sites.remove(&site, &key)?,
        SiteCommands::Count => println!("{}", sites.count()?),
        SiteCommands::List => print_json(&sites.all()?)?,
    }
    Ok(())
}

/// `idstore login ...`
fn cmd_login(storage: &LocalStorage, subcommand: LoginCommands) -> Result<()> {
    let logins = storage.logins();
    match subcommand {
        LoginCommands::Set { origin, email } => {
            logins.set_logged_in(&origin, email.as_deref())?;
        }
        LoginCommands::Get { origin } => print_optional(logins.logged_in(&origin)?),
        LoginCommands::Count => println!("{}", logins.logged_in_count()?),
        LoginCommands::LogoutAll => {
            logins.logout_everywhere()?;
            println!("Logged out everywhere");
        }
        LoginCommands::Watch { origin, count } => cmd_login_watch(storage, &origin, count)?,
    }
    Ok(())
}

/// `idstore login watch ORIGIN [--count N]`
fn cmd_login_watch(storage: &LocalStorage, origin: &str, count: Option<usize>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    runtime.block_on(async {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        storage
            .logins()
            .watch_logged_in(origin, move |now| {
                let _ = tx.send(now);
            })
            .context("failed to watch login state")?;

        let mut seen = 0usize;
        while let Some(now) = rx.recv().await {
            match now {
                Some(email) => println!("{origin}: logged in as {email}"),
                None => println!("{origin}: logged out"),
            }
            seen += 1;
            if count.is_some_and(|limit| seen >= limit) {
                break;
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}

/// `idstore trust ...`
fn cmd_trust(storage: &LocalStorage, subcommand: TrustCommands, verbose: bool) -> Result<()> {
    let trust = storage.trust();
    match subcommand {
        TrustCommands::Status { identity } => {
            let who = parse_identity(&identity);
            let record = trust.record(who.clone())?;
            match &record {
                Some(r) => println!("State:     {} (since {})", r.state, r.updated.to_rfc3339()),
                None => println!("State:     (none)"),
            }
            println!(
                "Confirmed: {}",
                trust.user_confirmed_on_computer(who.clone())
            );
            println!(
                "Ask:       {}",
                trust.should_ask_user_about_her_computer(who.clone())
            );
            if verbose {
                let resolved = storage.identities().map_email_to_user_id(&who)?;
                match resolved {
                    Some(id) => println!("Identity:  {id}"),
                    None => println!("Identity:  (unmapped)"),
                }
            }
        }
        TrustCommands::Seen { identity } => {
            trust.set_user_seen_on_computer(parse_identity(&identity))?;
        }
        TrustCommands::Confirm { identity } => {
            trust.set_user_confirmed_on_computer(parse_identity(&identity))?;
        }
        TrustCommands::Deny { identity } => {
            trust.set_not_my_computer(parse_identity(&identity))?;
        }
        TrustCommands::Set { identity, state } => {
            let state: TrustState = state.parse()?;
            trust.set_confirmation_state(parse_identity(&identity), state)?;
        }
        TrustCommands::ForceAsk { identity } => {
            trust.set_user_must_confirm_computer(parse_identity(&identity));
        }
        TrustCommands::Clear { identity } => {
            trust.clear_users_computer_ownership_status(parse_identity(&identity));
        }
    }
    Ok(())
}

/// `idstore map ...`
fn cmd_map(storage: &LocalStorage, subcommand: MapCommands) -> Result<()> {
    let identities = storage.identities();
    match subcommand {
        MapCommands::Update { user_id, emails } => {
            identities.update_email_to_user_id_mapping(user_id, emails.as_slice())?;
            println!("Mapped {} email(s) to {user_id}", emails.len());
        }
        MapCommands::Resolve { identity } => {
            print_optional(identities.map_email_to_user_id(&parse_identity(&identity))?);
        }
    }
    Ok(())
}

/// `idstore return-to ...`
fn cmd_return_to(storage: &LocalStorage, subcommand: ReturnToCommands) -> Result<()> {
    let return_to = storage.return_to();
    match subcommand {
        ReturnToCommands::Set { url } => return_to.set_return_to(&url)?,
        ReturnToCommands::Get => print_optional(return_to.get_return_to()?),
    }
    Ok(())
}

/// `idstore manage ...`
fn cmd_manage(storage: &LocalStorage, subcommand: ManageCommands) -> Result<()> {
    let manage = storage.manage_page();
    match subcommand {
        ManageCommands::Set { key, value } => manage.set(&key, parse_value(&value))?,
        ManageCommands::Get { key } => print_optional(manage.get(&key)?),
        ManageCommands::Remove { key } => manage.remove(&key)?,
    }
    Ok(())
}

/// `idstore sign-in-email ...`
fn cmd_sign_in_email(storage: &LocalStorage, subcommand: SignInEmailCommands) -> Result<()> {
    let sign_in = storage.sign_in_email();
    match subcommand {
        SignInEmailCommands::Set { email } => sign_in.set(&email)?,
        SignInEmailCommands::Get => print_optional(sign_in.get()?),
        SignInEmailCommands::Remove => sign_in.remove()?,
    }
    Ok(())
}
