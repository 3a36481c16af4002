//! `ws-loader`: replays loading scenarios against the loader controller.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::debug;
use wl_core::config::loader::{load_config, load_scenario};
use wl_core::loader::LoaderOptions;
use wl_core::replay::{replay, ReplayReport};
use wl_protocol::alert_models::AlertVariant;
use wl_protocol::ipc::Event;

#[derive(Parser)]
#[command(name = "ws-loader")]
#[command(about = "Replay workspace loading scenarios with scripted collaborators")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file and print the loader progress
    Replay {
        scenario: PathBuf,

        /// Directory holding `.ws-loader/`
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Let time jump forward instead of waiting out every delay
        #[arg(long)]
        fast: bool,

        /// Print the emitted events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Validate `.ws-loader/` and list what it contains
    CheckConfig {
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            scenario,
            root,
            fast,
            json,
        } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .start_paused(fast)
                .build()?;
            let report = runtime.block_on(run_replay(&scenario, &root))?;

            if json {
                for event in &report.events {
                    println!("{}", serde_json::to_string(event)?);
                }
            } else {
                print_report(&report);
            }

            if report.final_alert().is_some() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::CheckConfig { root } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(check_config(&root))
        }
    }
}

async fn run_replay(path: &Path, root: &Path) -> color_eyre::Result<ReplayReport> {
    let config = load_config(root).await?;
    let scenario = load_scenario(path)?;
    debug!(scenario = %scenario.name, "replaying scenario");

    replay(&scenario, LoaderOptions::from(&config))
        .await
        .map_err(|e| eyre!(e))
        .wrap_err_with(|| format!("Failed to replay {}", path.display()))
}

async fn check_config(root: &Path) -> color_eyre::Result<()> {
    let config = load_config(root).await?;

    println!("{}", "Configuration is valid".green().bold());
    println!("  config.toml: {:?}", config.loader);
    println!(
        "  default devfile: {}",
        if config.default_devfile.is_some() {
            "present"
        } else {
            "none"
        }
    );
    println!("  scenarios: {}", config.scenarios.len());
    for scenario in &config.scenarios {
        println!("    - {}", scenario.name);
    }
    Ok(())
}

fn print_report(report: &ReplayReport) {
    println!("{} {}", "Scenario".bold(), report.scenario);

    let mut last_index = None;
    let mut last_alert = None;
    for event in &report.events {
        match event {
            Event::Progress(view) => {
                if last_index != Some(view.current_step_index) {
                    if let Some(step) = view.steps.get(view.current_step_index) {
                        println!("  {} {}", "→".cyan(), step.title);
                    }
                    last_index = Some(view.current_step_index);
                }
                if view.alert != last_alert {
                    if let Some(alert) = &view.alert {
                        let title = match alert.variant {
                            AlertVariant::Danger => alert.title.red().bold(),
                            AlertVariant::Warning => alert.title.yellow().bold(),
                        };
                        println!("  {title}: {}", alert.body);
                        for action in &alert.actions {
                            println!("      [{}]", action.title);
                        }
                    }
                    last_alert = view.alert.clone();
                }
            }
            Event::Navigate { url } => println!("  {} {url}", "Navigate".green().bold()),
            Event::OAuthRedirect {
                authentication_url, ..
            } => println!("  {} {authentication_url}", "Authenticate".yellow()),
            Event::SwitchToWorkspace(workspace) => {
                println!("  {} {workspace}", "Switch to".green())
            }
            Event::ReturnToDashboard => println!("  {}", "Return to dashboard".green()),
            Event::LogAppended { line, .. } => println!("    {}", line.dimmed()),
        }
    }

    println!("  {} mocked call(s)", report.calls.len());
}
