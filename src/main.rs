use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::sync::Arc;

use mark::{
    agents::StreamOutcome,
    app::{load_config, Config},
    cli::{handle_command, Cli, OutputFormat},
    models::{Model, ModelFactory},
    runtime::{NonInteractiveRunner, Orchestrator},
    utils::{init_logger, log_debug},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_logger(cli.verbose);

    // Handle subcommands
    if let Some(command) = &cli.command {
        if handle_command(command)? {
            return Ok(()); // Command handled, exit
        }
        // Continue to chat for Commands::Chat
    }

    let mut config = load_config(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    log_debug(format!("Loaded configuration: {:?}", config));

    let model = ModelFactory::create(&config, cli.demo)?;

    if cli.is_non_interactive() {
        return run_non_interactive(cli, model, &config).await;
    }

    Orchestrator::new(model, &config).run().await
}

/// Run in non-interactive mode
async fn run_non_interactive(
    cli: Cli,
    model: Arc<dyn Model>,
    config: &Config,
) -> Result<()> {
    let mut runner = NonInteractiveRunner::new(model, config);
    for path in &cli.files {
        runner.add_file(path)?;
    }
    if let Some(prompt) = &cli.prompt {
        runner.add_text(prompt);
    }

    // JSON output prints only the summary
    let result = match cli.output_format {
        OutputFormat::Text => runner.execute(&mut std::io::stdout()).await?,
        OutputFormat::Json => runner.execute(&mut std::io::sink()).await?,
    };

    let formatted = runner.format_result(&result, cli.output_format);
    let mut stdout = std::io::stdout();
    if cli.output_format == OutputFormat::Text {
        writeln!(stdout)?;
    }
    if !formatted.is_empty() {
        writeln!(stdout, "{}", formatted)?;
    }

    // Exit with appropriate code
    if result.outcome == StreamOutcome::Failed {
        std::process::exit(1);
    }

    Ok(())
}
