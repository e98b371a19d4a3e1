use anyhow::Result;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use stillcast::app::{ConvertOptions, RunOutcome, run_convert_command};
use stillcast::cli::{Cli, Commands, ConfigAction};
use stillcast::config::Config;
use stillcast::exec::SystemCommandExecutor;
use stillcast::preflight::check_dependencies;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        None => {
            let config = load_config(cli.config.as_deref())?;
            let opts = ConvertOptions {
                inputs: cli.inputs,
                image: cli.image,
                output: cli.output,
                fit: cli.fit,
                json: cli.json,
                quiet: cli.quiet,
                verbose: cli.verbose,
            };
            match run_convert_command(config, opts).await {
                Ok(RunOutcome::AllSucceeded) => {}
                Ok(outcome) => std::process::exit(outcome.exit_code()),
                Err(e) => {
                    eprintln!("{}", format!("Error: {}", e).red());
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Check) => {
            let config = load_config(cli.config.as_deref())?;
            println!("stillcast {}\n", stillcast::version_string());
            if !check_dependencies(&config, &SystemCommandExecutor::new()) {
                std::process::exit(1);
            }
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => {
                let config = load_config(cli.config.as_deref())?;
                print!("{}", config.to_toml()?);
            }
            ConfigAction::Path => {
                let path = match cli.config {
                    Some(path) => path,
                    None => Config::default_path()?,
                };
                println!("{}", path.display());
                if !path.exists() {
                    eprintln!("{}", "(file does not exist, defaults are in use)".dimmed());
                }
            }
        },
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "stillcast", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Route `log` output to stderr. `RUST_LOG` wins over the verbosity flags.
fn init_logging(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn load_config(custom_path: Option<&std::path::Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        // Load from custom path
        Config::load(path)?
    } else {
        // Try default path, fall back to defaults
        let default_path = Config::default_path()?;
        Config::load_or_default(&default_path)?
    };

    // Apply environment variable overrides
    Ok(config.with_env_overrides()?)
}
