//! Ask command

use super::join_words;
use crate::app::{AskArgs, OutputFormat};
use anyhow::Result;
use microrag_core::{AnswerPipeline, Config, MetricsRecorder, MicroRagError, PipelineAnswer};
use std::sync::Arc;

pub async fn run(args: AskArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let question = join_words(&args.question)?;
    let pipeline = AnswerPipeline::from_config(config, Arc::new(MetricsRecorder::new()))?;

    match pipeline.answer(&question, args.top_k.map(usize::from)).await {
        Ok(answer) => {
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&answer)?),
                OutputFormat::Cli => print!("{}", format_answer(&answer)),
            }
            Ok(())
        }
        Err(MicroRagError::QueryBlocked(violation)) => {
            if format == OutputFormat::Json {
                let body = serde_json::json!({ "error": "query_blocked", "violation": violation });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("{}", violation.message);
            }
            Err(MicroRagError::QueryBlocked(violation).into())
        }
        Err(e) => Err(e.into()),
    }
}

fn format_answer(answer: &PipelineAnswer) -> String {
    let mut output = String::new();

    output.push_str(&answer.answer);
    output.push_str("\n\n");

    if !answer.citations.is_empty() {
        output.push_str("Sources:\n");
        for (i, citation) in answer.citations.iter().enumerate() {
            let location = match citation.page {
                Some(page) => format!("{}, page {}", citation.source, page),
                None => citation.source.clone(),
            };
            output.push_str(&format!(
                "  [{}] {:>3}% {}\n",
                i + 1,
                (citation.score * 100.0).round() as i64,
                location
            ));
        }
        output.push('\n');
    }

    let m = &answer.metrics;
    output.push_str(&format!(
        "Latency: {:.0} ms (retrieval {:.0} ms, generation {:.0} ms)\n",
        m.total_latency_ms, m.retrieval_latency_ms, m.llm_latency_ms
    ));
    output.push_str(&format!(
        "Tokens:  {} prompt + {} completion = {}\n",
        m.prompt_tokens, m.completion_tokens, m.total_tokens
    ));
    if let Some(score) = m.groundedness_score {
        output.push_str(&format!("Groundedness: {:.3}\n", score));
    }

    output
}
