//! Check command

use super::join_words;
use crate::app::{CheckArgs, OutputFormat};
use anyhow::Result;
use microrag_core::{Config, GuardrailEngine, MicroRagError};
use serde_json::json;

pub async fn run(args: CheckArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let query = join_words(&args.query)?;
    let engine = GuardrailEngine::new(config.guardrails.max_query_length);

    match engine.validate(&query) {
        Ok(()) => {
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "accepted": true }))?);
                }
                OutputFormat::Cli => println!("accepted"),
            }
            Ok(())
        }
        Err(violation) => {
            match format {
                OutputFormat::Json => {
                    let body = json!({ "accepted": false, "violation": violation });
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                OutputFormat::Cli => {
                    println!("blocked: {}", violation.policy);
                    println!("  Reason:  {}", violation.reason);
                    println!("  Message: {}", violation.message);
                }
            }
            Err(MicroRagError::from(violation).into())
        }
    }
}
