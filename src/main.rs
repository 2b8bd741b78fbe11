use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use indicatif::{ProgressBar, ProgressStyle};
use log::{LevelFilter, debug, error, info};
use nc2geojson::cli::{Cli, Commands, ConvertArgs, DisplayFormat, merge_config, render_template};
use nc2geojson::info::{get_dataset_info, print_info_human, print_info_json, print_info_yaml};
use nc2geojson::input::JobConfig;
use nc2geojson::log::{config_echo, show_farewell_with_timing, show_greeting, show_summary};
use nc2geojson::process_job_async;
use nc2geojson::storage::Location;
use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// `--verbose`/`--quiet` pick the level; RUST_LOG, when set, wins.
fn init_logging(verbose: bool, quiet: bool) {
    let env = env_logger::Env::default().default_filter_or(default_level(verbose, quiet).as_str());
    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .init();
}

fn default_level(verbose: bool, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Convert(ref args) => convert(cli.config.as_deref(), args, cli.quiet).await,
        Commands::Validate {
            ref config_file,
            detailed,
        } => validate(config_file.as_deref().or(cli.config.as_deref()), detailed),
        Commands::Info {
            ref file,
            detailed,
            ref variable,
            format,
        } => {
            let info = get_dataset_info(file, variable.as_deref(), detailed).await?;
            match format {
                DisplayFormat::Human => print_info_human(&info),
                DisplayFormat::Json => print_info_json(&info)?,
                DisplayFormat::Yaml => print_info_yaml(&info)?,
            }
            Ok(())
        }
        Commands::Template {
            template_type,
            ref output,
            format,
        } => {
            let rendered = render_template(template_type, format)?;
            write_or_print(output.as_deref(), &rendered)
        }
        Commands::Completions { shell, ref output } => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            match output {
                Some(path) => {
                    let mut file = fs::File::create(path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    generate(shell, &mut command, name, &mut file);
                }
                None => generate(shell, &mut command, name, &mut io::stdout()),
            }
            Ok(())
        }
    }
}

async fn convert(config_path: Option<&Path>, args: &ConvertArgs, quiet: bool) -> Result<()> {
    let start_time = Instant::now();

    let base = match config_path {
        Some(path) => {
            if !quiet {
                show_greeting(&path.display().to_string());
            }
            Some(
                JobConfig::from_file(path)
                    .with_context(|| format!("Failed to load {}", path.display()))?,
            )
        }
        None => {
            if !quiet {
                show_greeting("command line");
            }
            None
        }
    };
    let config = merge_config(base, args)?;
    if !quiet {
        config_echo(&config);
    }

    if args.dry_run {
        info!("Dry run: configuration is valid, nothing written");
        return Ok(());
    }

    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        new_spinner(&format!("Converting {} from {}", config.variable, config.input))
    };
    let result = process_job_async(&config, args.force).await;
    spinner.finish_and_clear();
    let summary = result?;

    if !quiet {
        show_summary(&summary);
        show_farewell_with_timing(start_time.elapsed());
    }
    Ok(())
}

fn validate(config_path: Option<&Path>, detailed: bool) -> Result<()> {
    let path = config_path.context("No configuration file given (pass a path or --config)")?;
    let config = JobConfig::from_file(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    config.validate()?;
    debug!("Configuration fields are valid");

    if detailed {
        if let Location::Local(input) = Location::parse(&config.input)? {
            anyhow::ensure!(input.exists(), "Input file not found: {}", input.display());
        }
        Location::parse(&config.output)?;
        config_echo(&config);
    }
    println!("Configuration {} is valid", path.display());
    Ok(())
}

fn new_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn write_or_print(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Template written to {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
