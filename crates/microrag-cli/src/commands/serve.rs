//! Serve command

use crate::app::ServeArgs;
use anyhow::Result;
use microrag_core::{AnswerPipeline, Config, MetricsRecorder};
use std::sync::Arc;

pub async fn run(args: ServeArgs, config: &Config) -> Result<()> {
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());

    tracing::info!("Starting application initialization");
    let pipeline = AnswerPipeline::from_config(config, Arc::new(MetricsRecorder::new()))?;
    tracing::info!(
        documents_indexed = pipeline.documents_indexed(),
        embedding_model = pipeline.embedding_model(),
        llm_model = pipeline.llm_model(),
        guardrails_enabled = config.guardrails.enabled,
        "Application initialization complete"
    );

    microrag_server::start_server(Arc::new(pipeline), &bind).await
}
