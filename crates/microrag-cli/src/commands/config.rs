//! Config command

use crate::app::{ConfigArgs, OutputFormat};
use anyhow::Result;
use microrag_core::Config;

pub async fn run(args: ConfigArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let path = Config::resolve_path();

    if args.path {
        println!("{}", path.display());
        return Ok(());
    }

    if args.init {
        if path.exists() {
            println!("Config already exists at {}", path.display());
        } else {
            config.save_to(&path)?;
            println!("Wrote default config to {}", path.display());
        }
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Cli => print!("{}", serde_yaml::to_string(config)?),
    }
    Ok(())
}
