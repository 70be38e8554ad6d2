use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::{fmt, EnvFilter};

use restguard::authz::loader;
use restguard::authz::types::{AuthorizeResponse, Caller, HttpVerb};
use restguard::errors::GuardError;
use restguard::settings::Settings;
use restguard::web;

#[derive(Parser, Debug)]
#[command(
    name = "restguard",
    version,
    about = "Declarative access control for REST resource handlers"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "restguard.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the authorization decision API (default)
    Serve,
    /// Evaluate a single request against the loaded rules
    Check {
        /// HTTP method, e.g. GET
        #[arg(long)]
        method: String,
        /// Request path, e.g. /events/42
        #[arg(long)]
        path: String,
        /// Mount path of the handler group, e.g. /events
        #[arg(long, default_value = "")]
        base: String,
        /// Caller role (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,
        /// Caller permission (repeatable)
        #[arg(long = "permission")]
        permissions: Vec<String>,
    },
    /// List endpoints declared without any role or permission
    Coverage,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let engine = Arc::new(loader::load_engine(&settings).map_err(GuardError::from)?);
            web::serve(&settings, engine).await?;
        }
        Command::Check {
            method,
            path,
            base,
            roles,
            permissions,
        } => {
            let verb: HttpVerb = method
                .parse()
                .map_err(|e| GuardError::BadRequest(format!("{e}")))?;
            let engine = loader::load_engine(&settings).map_err(GuardError::from)?;
            let caller = Caller::with_roles(roles).permissions(permissions);
            let decision = engine.decide(verb, &path, &base, &caller);
            let response = AuthorizeResponse {
                allowed: decision.is_granted(),
                decision,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&response).into_diagnostic()?
            );
        }
        Command::Coverage => {
            let table = loader::load_rules(&settings.rules.dir, settings.rules.ungranted)
                .map_err(GuardError::from)?;
            if table.uncovered().is_empty() {
                println!("all {} rule paths declare grants", table.len());
            }
            for endpoint in table.uncovered() {
                println!(
                    "{:<7} {:<40} {}::{}",
                    endpoint.verb.as_str(),
                    endpoint.path,
                    endpoint.handler,
                    endpoint.method
                );
            }
        }
    }
    Ok(())
}
