// CLI masking commands: mask, last, clear

use std::io::{IsTerminal, Read};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::cache::{JsonCacheStore, MaskingCache};
use crate::errors::MaskError;
use crate::models::{JobOutcome, MaskConfig, MaskingOptions};
use crate::pipeline::MaskingService;
use crate::settings::ConfigSettingsProvider;

fn open_cache(config: &MaskConfig) -> MaskingCache {
    match config.resolved_cache_path() {
        Some(path) => MaskingCache::new(Arc::new(JsonCacheStore::new(path))),
        None => {
            tracing::warn!("no data directory available, cache will not persist");
            MaskingCache::in_memory()
        }
    }
}

/// Pick the input source: positional text, then `--file`, then piped stdin.
fn resolve_input(text: Option<&str>, file: Option<&Path>) -> anyhow::Result<String> {
    if let Some(text) = text {
        return Ok(text.to_string());
    }
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()));
    }
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Err(MaskError::Usage(
            "text is required: pass it as an argument, with --file, or on stdin".to_string(),
        )
        .into());
    }
    let mut buf = String::new();
    stdin
        .lock()
        .read_to_string(&mut buf)
        .context("Failed to read stdin")?;
    Ok(buf)
}

/// mask-cut mask
pub async fn cmd_mask(
    config_path: Option<&Path>,
    text: Option<&str>,
    file: Option<&Path>,
    options: Option<MaskingOptions>,
    json: bool,
) -> anyhow::Result<()> {
    let provider = ConfigSettingsProvider::new(config_path.map(Path::to_path_buf));
    let config = provider.load_config().await?;
    let input = resolve_input(text, file)?;

    let service =
        MaskingService::builder(Arc::new(open_cache(&config)), Arc::new(provider)).build();

    let receipt = service.enqueue(&input, options).await?;
    tracing::debug!("submitted job {}", receipt.job_id);
    let outcome = receipt.outcome().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }
    match outcome {
        JobOutcome::Succeeded { masked_text, .. } => {
            if !json {
                println!("{}", masked_text);
            }
            Ok(())
        }
        JobOutcome::Failed { error } => Err(error.into()),
    }
}

/// mask-cut last
pub async fn cmd_last(config_path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = ConfigSettingsProvider::new(config_path.map(Path::to_path_buf))
        .load_config()
        .await?;
    let cache = open_cache(&config);

    let result = cache.last_result().await?;
    let input = cache.last_input().await?;

    if json {
        let value = serde_json::json!({
            "lastInput": input,
            "lastResult": result,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match (result, input) {
        (Some(snapshot), _) => {
            println!("{}", snapshot.masked_text);
            eprintln!(
                "({} via {}, {})",
                snapshot.model,
                snapshot.endpoint,
                snapshot.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        (None, Some(input)) => {
            println!("No cached result. Last input:");
            println!("{}", input);
        }
        (None, None) => println!("No cached result."),
    }
    Ok(())
}

/// mask-cut clear
pub async fn cmd_clear(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = ConfigSettingsProvider::new(config_path.map(Path::to_path_buf))
        .load_config()
        .await?;
    open_cache(&config).clear().await?;
    println!("Cache cleared.");
    Ok(())
}
