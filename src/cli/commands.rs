use anyhow::Result;
use colored::Colorize;

use crate::app::init_config;

use super::Commands;

/// Handle CLI subcommands
///
/// Returns true when the command was fully handled and the program should exit.
pub fn handle_command(command: &Commands) -> Result<bool> {
    match command {
        Commands::Init => {
            let (path, created) = init_config()?;
            if created {
                println!("Created default configuration at: {}", path.display().to_string().green());
            } else {
                println!("Configuration already exists at: {}", path.display());
            }
            Ok(true)
        }
        Commands::Version => {
            show_version();
            Ok(true)
        }
        Commands::Chat => Ok(false), // Continue to chat interface
    }
}

/// Show version information
pub fn show_version() {
    println!("Mark v{}", env!("CARGO_PKG_VERSION"));
    println!("   A terminal chat assistant that streams replies over your context");
}
