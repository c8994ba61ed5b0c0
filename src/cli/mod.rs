//! Command-line interface
//!
//! `serve` runs the HTTP server; `migrate` prepares the database;
//! `create-site` provisions a site from the shell. Provisioning failures are
//! reported as diagnostics, not panics, so a half-configured environment
//! produces a readable message instead of a stack trace.

use crate::config::Config;
use crate::domain::{CreateSiteInput, Domain, StringUuid, User};
use crate::repository::{DomainRepository, UserRepository, UserRepositoryImpl};
use crate::server;
use anyhow::Result;
use clap::{Parser, Subcommand};
use sqlx::mysql::MySqlPoolOptions;

#[derive(Parser)]
#[command(name = "quillpress-core", version, about = "QuillPress publishing platform core")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Create the database if needed and apply schema migrations
    Migrate,
    /// Provision a site with its group and canonical domain
    CreateSite {
        /// Email or ID of the owning user. Defaults to the oldest superuser.
        #[arg(long)]
        user: Option<String>,
        /// Subdomain for the site.
        #[arg(long, default_value = "www")]
        subdomain: String,
        /// Name of the site. Defaults to "<subdomain>.<root domain>".
        #[arg(long)]
        name: Option<String>,
    },
}

/// Dispatch a parsed command line.
pub async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        None | Some(Commands::Serve) => server::run(config).await,
        Some(Commands::Migrate) => crate::migration::setup(&config).await,
        Some(Commands::CreateSite {
            user,
            subdomain,
            name,
        }) => create_site(config, user, subdomain, name).await,
    }
}

async fn create_site(
    config: Config,
    user: Option<String>,
    subdomain: String,
    name: Option<String>,
) -> Result<()> {
    let db_pool = MySqlPoolOptions::new()
        .max_connections(2)
        .connect(&config.database.url)
        .await?;

    let user_repo = UserRepositoryImpl::new(db_pool.clone());

    if !user_repo.any_exist().await? {
        eprintln!("No users found. Please create a user first.");
        return Ok(());
    }

    let Some(owner) = resolve_owner(&user_repo, user.as_deref()).await? else {
        return Ok(());
    };

    let name = name.unwrap_or_else(|| format!("{}.{}", subdomain, config.sites.root_domain));

    let state = server::build_state(config, db_pool);

    println!("Creating site '{}' with subdomain '{}'...", name, subdomain);
    let site = match state
        .site_service
        .create_site(CreateSiteInput {
            owner_id: owner.id,
            name,
            subdomain,
        })
        .await
    {
        Ok(site) => site,
        Err(e) => {
            eprintln!("Error creating site: {}", e);
            return Ok(());
        }
    };

    // The very first site also answers on localhost, so a fresh install is
    // browsable before DNS exists.
    if state.site_service.list(1, 2).await?.1 == 1 {
        println!("Creating default domain 'localhost' for the site...");
        if let Err(e) = state.domain_repo.save(&Domain::new(site.id, "localhost")).await {
            eprintln!("Error creating default domain: {}", e);
            return Ok(());
        }
    }

    println!("Setup completed successfully.");
    Ok(())
}

/// The explicit `--user` (UUID or email), or the oldest superuser.
async fn resolve_owner(
    user_repo: &UserRepositoryImpl,
    user: Option<&str>,
) -> Result<Option<User>> {
    if let Some(input) = user {
        let found = match StringUuid::parse_str(input) {
            Ok(id) => user_repo.find_by_id(id).await?,
            Err(_) => user_repo.find_by_email(input).await?,
        };
        if found.is_none() {
            eprintln!("User '{}' not found.", input);
        }
        return Ok(found);
    }

    let superuser = user_repo.first_superuser().await?;
    if superuser.is_none() {
        eprintln!("No superuser found. Please create a superuser first.");
    }
    Ok(superuser)
}
