//! Command-line interface.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{OutputFormat, Provider, ProvisioningRequest};
use crate::setup::graph::ACCESS_TOKEN_ENV;
use crate::setup::interaction::ConsoleDisplay;
use crate::setup::SetupOrchestrator;
use crate::subprocess::SubprocessManager;

/// Provision OAuth client applications across identity providers
#[derive(Parser)]
#[command(name = "credforge")]
#[command(about = "Provision OAuth client applications across identity providers", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision OAuth applications for the selected providers
    Setup(SetupArgs),
    /// Verify external CLI availability and authentication state
    Check(CheckArgs),
    /// List supported providers and their automation level
    Providers,
}

#[derive(Debug, Args, Clone)]
pub struct SetupArgs {
    /// Application name used to derive resource names
    #[arg(value_name = "PROJECT")]
    pub project: String,

    /// Domain the OAuth application serves (redirect URI host)
    #[arg(short, long, value_name = "DOMAIN")]
    pub domain: String,

    /// Providers to provision (default: all)
    #[arg(long, value_delimiter = ',', value_name = "PROVIDER")]
    pub providers: Vec<Provider>,

    /// Simulate every external call without performing it
    #[arg(long)]
    pub dry_run: bool,

    /// Never prompt; record manual instructions instead of collecting values
    ///
    /// For automation pipelines. Providers that cannot be fully automated
    /// end up as "manual setup required" and the process exits non-zero.
    #[arg(long)]
    pub non_interactive: bool,

    /// Overwrite existing output files
    #[arg(short, long)]
    pub force: bool,

    /// Credential file format
    #[arg(long, value_enum, default_value = "env")]
    pub format: OutputFormat,

    /// Credential file path (default depends on the format)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct CheckArgs {
    /// Providers to check (default: all)
    #[arg(long, value_delimiter = ',', value_name = "PROVIDER")]
    pub providers: Vec<Provider>,
}

impl SetupArgs {
    pub fn into_request(self, verbose: bool) -> ProvisioningRequest {
        let providers = if self.providers.is_empty() {
            Provider::ALL.to_vec()
        } else {
            self.providers
        };
        ProvisioningRequest {
            project_name: self.project,
            domain: self.domain,
            providers,
            dry_run: self.dry_run,
            interactive: !self.non_interactive,
            force: self.force,
            verbose,
            format: self.format,
            output_path: self.output,
        }
    }
}

/// Run the setup command. Returns the process exit code.
pub async fn run_setup(args: SetupArgs, verbose: bool) -> Result<i32> {
    let request = args.into_request(verbose);
    let orchestrator = SetupOrchestrator::production().context("failed to initialize")?;
    let run = orchestrator.run(&request).await?;
    Ok(if run.all_provisioned() { 0 } else { 1 })
}

/// Probe tool availability and authentication per provider.
pub async fn run_check(args: CheckArgs) -> Result<i32> {
    let providers = if args.providers.is_empty() {
        Provider::ALL.to_vec()
    } else {
        args.providers
    };

    let subprocess = SubprocessManager::production();
    let display = ConsoleDisplay::new();
    let mut failures = 0;

    for provider in Provider::ALL {
        if !providers.contains(&provider) {
            continue;
        }
        match provider {
            Provider::CloudOauth | Provider::DirectoryTenant => {
                let tool = if provider == Provider::CloudOauth {
                    subprocess.gcloud()
                } else {
                    subprocess.az()
                };
                let probed = match tool.ensure_available().await {
                    Ok(()) => tool.authenticate().await,
                    Err(e) => Err(e),
                };
                match probed {
                    Ok(account) => display.success(&format!(
                        "{}: '{}' available, authenticated as {account}",
                        provider.display_name(),
                        tool.name()
                    )),
                    Err(e) => {
                        display.error(&format!("{}: {e}", provider.display_name()));
                        failures += 1;
                    }
                }
            }
            Provider::SocialGraph => {
                if std::env::var(ACCESS_TOKEN_ENV).is_ok() {
                    display.success(&format!(
                        "{}: {ACCESS_TOKEN_ENV} is set",
                        provider.display_name()
                    ));
                } else {
                    display.warning(&format!(
                        "{}: {ACCESS_TOKEN_ENV} is not set; authentication will fail",
                        provider.display_name()
                    ));
                    failures += 1;
                }
            }
            Provider::MobilePlatform => {
                display.info(&format!(
                    "{}: manual only (no CLI or public API)",
                    provider.display_name()
                ));
            }
        }
    }

    Ok(if failures == 0 { 0 } else { 1 })
}

/// Print the provider capability listing.
pub fn run_providers() -> i32 {
    println!("{:<18} {:<12} {}", "PROVIDER", "AUTOMATION", "REQUIRES");
    for provider in Provider::ALL {
        let automation = match provider {
            Provider::MobilePlatform => "manual",
            _ => "automated",
        };
        let requires = match provider {
            Provider::SocialGraph => ACCESS_TOKEN_ENV,
            Provider::MobilePlatform => "developer portal account",
            _ => provider.required_tool().unwrap_or("-"),
        };
        println!("{:<18} {:<12} {}", provider.as_str(), automation, requires);
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn setup_args_default_to_all_providers_interactive() {
        let cli = Cli::parse_from([
            "credforge",
            "setup",
            "Demo Shop",
            "--domain",
            "demo.example.com",
        ]);
        let Commands::Setup(args) = cli.command else {
            panic!("expected setup command");
        };
        let request = args.into_request(false);
        assert_eq!(request.providers.len(), 4);
        assert!(request.interactive);
        assert!(!request.dry_run);
    }

    #[test]
    fn provider_subset_is_parsed_from_comma_list() {
        let cli = Cli::parse_from([
            "credforge",
            "setup",
            "Demo",
            "--domain",
            "demo.example.com",
            "--providers",
            "cloud-oauth,directory-tenant",
            "--dry-run",
            "--non-interactive",
        ]);
        let Commands::Setup(args) = cli.command else {
            panic!("expected setup command");
        };
        let request = args.into_request(false);
        assert_eq!(
            request.providers,
            vec![Provider::CloudOauth, Provider::DirectoryTenant]
        );
        assert!(request.dry_run);
        assert!(!request.interactive);
    }
}
