//! o365lm CLI entrypoint.
//!
//! This is the main entrypoint for the o365lm command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use o365_license_manager::cli::{Cli, Commands, OutputFormatter};
use o365_license_manager::config::{
    ConfigParser, ConfigValidator, LicenseConfig, find_config_file,
};
use o365_license_manager::error::{O365Error, ReconcileError, Result};
use o365_license_manager::graph::{GraphClient, TokenFetcher};
use o365_license_manager::reconciler::LicenseReconciler;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => cmd_validate(cli.config.as_ref(), warnings),
        Commands::Plan { detailed } => cmd_plan(cli.config.as_ref(), detailed, &formatter).await,
        Commands::Apply { yes } => cmd_apply(cli.config.as_ref(), yes, &formatter).await,
        Commands::Status => cmd_status(cli.config.as_ref(), &formatter).await,
        Commands::Drift => cmd_drift(cli.config.as_ref(), &formatter).await,
        Commands::Import {
            user_principal_name,
        } => cmd_import(cli.config.as_ref(), &user_principal_name, &formatter).await,
        Commands::Destroy { yes } => cmd_destroy(cli.config.as_ref(), yes, &formatter).await,
    }
}

/// Initialize a new license configuration.
fn cmd_init(path: &PathBuf, force: bool) -> Result<()> {
    info!("Initializing license configuration in: {}", path.display());

    let config_path = path.join("o365.licenses.yaml");
    let env_path = path.join(".env.example");

    if !force && config_path.exists() {
        eprintln!(
            "Configuration file already exists: {}",
            config_path.display()
        );
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    let config_template = include_str!("../templates/o365.licenses.yaml");
    std::fs::write(&config_path, config_template)?;
    eprintln!("Created: {}", config_path.display());

    let env_template = include_str!("../templates/.env.example");
    std::fs::write(&env_path, env_template)?;
    eprintln!("Created: {}", env_path.display());

    eprintln!("\nNext steps:");
    eprintln!("  1. Copy .env.example to .env and fill in your app registration");
    eprintln!("  2. Declare your users and licenses in o365.licenses.yaml");
    eprintln!("  3. Run `o365lm plan` to preview changes");

    Ok(())
}

/// Validate the configuration file.
fn cmd_validate(config_path: Option<&PathBuf>, show_warnings: bool) -> Result<()> {
    let config = load_config(config_path)?;

    let validator = ConfigValidator::new();
    let result = validator.validate(&config)?;

    eprintln!(
        "Configuration valid: {} user(s), {} license assignment(s)",
        config.users.len(),
        config.total_assignments()
    );

    if show_warnings && !result.warnings.is_empty() {
        eprintln!("\nWarnings:");
        for warning in &result.warnings {
            eprintln!("  - {warning}");
        }
    }

    Ok(())
}

/// Show what apply would change.
async fn cmd_plan(
    config_path: Option<&PathBuf>,
    detailed: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = load_and_validate(config_path)?;
    let client = build_client(&config).await?;
    let reconciler = LicenseReconciler::new(&client);

    let report = reconciler.check_drift(&config).await?;
    println!("{}", formatter.format_plan(&report, detailed));

    Ok(())
}

/// Converge assignments to the configuration.
async fn cmd_apply(
    config_path: Option<&PathBuf>,
    yes: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = load_and_validate(config_path)?;

    if !yes
        && !confirm(&format!(
            "Apply license changes for {} user(s) in tenant '{}'?",
            config.users.len(),
            config.tenant.name
        ))?
    {
        eprintln!("Aborted.");
        return Ok(());
    }

    let client = build_client(&config).await?;
    let reconciler = LicenseReconciler::new(&client);

    let result = reconciler.apply_all(&config).await?;
    println!("{}", formatter.format_reconciliation(&result));

    if result.success {
        Ok(())
    } else {
        Err(O365Error::Reconcile(ReconcileError::Aborted {
            reason: format!("{} user(s) failed to reconcile", result.errors.len()),
        }))
    }
}

/// Show currently assigned licenses for configured users.
async fn cmd_status(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let config = load_and_validate(config_path)?;
    let client = build_client(&config).await?;
    let reconciler = LicenseReconciler::new(&client);

    let mut states = Vec::new();
    let mut missing = Vec::new();

    for user in &config.users {
        match reconciler.read(&user.user_principal_name).await? {
            Some(state) => states.push(state),
            None => missing.push(user.user_principal_name.clone()),
        }
    }

    println!("{}", formatter.format_status(&states));

    for user in &missing {
        eprintln!("Warning: user {user} not found in tenant");
    }

    Ok(())
}

/// Check for drift between config and the tenant.
async fn cmd_drift(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let config = load_and_validate(config_path)?;
    let client = build_client(&config).await?;
    let reconciler = LicenseReconciler::new(&client);

    let report = reconciler.check_drift(&config).await?;
    println!("{}", formatter.format_drift(&report));

    Ok(())
}

/// Import an existing user's assignments as a config snippet.
async fn cmd_import(
    config_path: Option<&PathBuf>,
    user_principal_name: &str,
    formatter: &OutputFormatter,
) -> Result<()> {
    // Import works without a config file as long as the tenant is in the
    // environment.
    let config = load_config(config_path).ok();
    let client = build_client_with_fallback(config.as_ref()).await?;
    let reconciler = LicenseReconciler::new(&client);

    let imported = reconciler.import(user_principal_name).await?;
    println!("{}", formatter.format_import(&imported));

    Ok(())
}

/// Remove every managed license assignment.
async fn cmd_destroy(
    config_path: Option<&PathBuf>,
    yes: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = load_and_validate(config_path)?;

    if !yes
        && !confirm(&format!(
            "Remove ALL managed licenses from {} user(s) in tenant '{}'?",
            config.users.len(),
            config.tenant.name
        ))?
    {
        eprintln!("Aborted.");
        return Ok(());
    }

    let client = build_client(&config).await?;
    let reconciler = LicenseReconciler::new(&client);

    let result = reconciler.destroy_all(&config).await?;
    println!("{}", formatter.format_reconciliation(&result));

    if result.success {
        Ok(())
    } else {
        Err(O365Error::Reconcile(ReconcileError::Aborted {
            reason: format!("{} user(s) failed to tear down", result.errors.len()),
        }))
    }
}

/// Loads the configuration, discovering the file when no path was given.
fn load_config(config_path: Option<&PathBuf>) -> Result<LicenseConfig> {
    let path = match config_path {
        Some(p) => p.clone(),
        None => find_config_file(std::env::current_dir()?)?,
    };

    let parser = parser_for(&path);
    parser.load_dotenv()?;
    parser.load_with_env(&path)
}

/// Loads and validates the configuration.
fn load_and_validate(config_path: Option<&PathBuf>) -> Result<LicenseConfig> {
    let config = load_config(config_path)?;

    let validator = ConfigValidator::new();
    let result = validator.validate(&config)?;
    for warning in &result.warnings {
        debug!("Validation warning: {warning}");
    }

    Ok(config)
}

/// Builds a parser rooted next to the configuration file.
fn parser_for(path: &Path) -> ConfigParser {
    path.parent().map_or_else(ConfigParser::new, |dir| {
        ConfigParser::new().with_base_path(dir)
    })
}

/// Acquires a token and builds the Graph client for a loaded configuration.
async fn build_client(config: &LicenseConfig) -> Result<GraphClient> {
    build_client_with_fallback(Some(config)).await
}

/// Builds the Graph client, resolving the tenant from config or environment.
async fn build_client_with_fallback(config: Option<&LicenseConfig>) -> Result<GraphClient> {
    let (client_id, client_secret) = ConfigParser::get_client_credentials()?;

    let tenant_id = match config {
        Some(c) => ConfigParser::get_tenant_id(c)?,
        None => std::env::var(o365_license_manager::config::ENV_TENANT_ID).map_err(|_| {
            O365Error::Config(o365_license_manager::error::ConfigError::MissingEnvVar {
                name: String::from(o365_license_manager::config::ENV_TENANT_ID),
            })
        })?,
    };

    debug!("Acquiring token for tenant {tenant_id}");
    let fetcher = TokenFetcher::new()?;
    let bearer = fetcher
        .fetch_bearer(&client_id, &client_secret, &tenant_id)
        .await?;

    GraphClient::new(bearer)
}

/// Asks the user for confirmation on stderr.
fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt} [y/N] ");
    std::io::stderr().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let answer = answer.trim();

    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}
