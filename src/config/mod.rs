mod types;

pub use types::*;

use crate::{Error, Result};
use std::{env, path::Path, str::FromStr};
use tracing::debug;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Loads the YAML config named by `CONFIG_PATH` (or `config.yaml`), applies
/// environment overrides and validates the result.
///
/// A missing `config.yaml` falls back to built-in defaults; a missing file
/// named explicitly through `CONFIG_PATH` is an error.
pub async fn load() -> Result<Config> {
    let explicit = env::var("CONFIG_PATH").ok();
    let config_path = explicit
        .clone()
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let mut config = if explicit.is_none() && !Path::new(&config_path).exists() {
        debug!("No {} found, using built-in defaults", config_path);
        Config::default()
    } else {
        load_from(&config_path).await?
    };

    apply_overrides(&mut config, |key| env::var(key).ok())?;
    validate(&config)?;

    Ok(config)
}

pub async fn load_from(config_path: &str) -> Result<Config> {
    debug!("Loading configuration from: {}", config_path);

    let config_str = tokio::fs::read_to_string(config_path).await?;
    let config: Config = serde_yaml::from_str(&config_str)?;

    Ok(config)
}

/// Applies `GATEWAY_*`, `EMBEDDING_*` and `GENERATION_*` overrides. `lookup`
/// returns the value of a variable, if set.
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("GATEWAY_HOST") {
        config.server.host = host;
    }
    if let Some(port) = lookup("GATEWAY_PORT") {
        config.server.port = parse_var("GATEWAY_PORT", &port)?;
    }
    if let Some(kind) = lookup("GATEWAY_KIND") {
        config.gateway = match kind.to_ascii_lowercase().as_str() {
            "embedding" => GatewayKind::Embedding,
            "chat" => GatewayKind::Chat,
            other => {
                return Err(Error::config(format!(
                    "GATEWAY_KIND must be 'embedding' or 'chat', got '{}'",
                    other
                )));
            }
        };
    }

    if let Some(path) = lookup("EMBEDDING_MODEL_PATH") {
        config.embedding.model_path = path;
    }
    if let Some(path) = lookup("EMBEDDING_TOKENIZER_PATH") {
        config.embedding.tokenizer_path = path;
    }
    if let Some(device) = lookup("EMBEDDING_DEVICE") {
        config.embedding.device = match device.to_ascii_lowercase().as_str() {
            "cpu" => Device::Cpu,
            "cuda" => Device::Cuda,
            other => {
                return Err(Error::config(format!(
                    "EMBEDDING_DEVICE must be 'cpu' or 'cuda', got '{}'",
                    other
                )));
            }
        };
    }

    if let Some(base_url) = lookup("GENERATION_BASE_URL") {
        match config.generation.as_mut() {
            Some(generation) => generation.base_url = base_url,
            None => config.generation = Some(GenerationConfig::new(base_url)),
        }
    }
    if let Some(generation) = config.generation.as_mut() {
        if let Some(api_key) = lookup("GENERATION_API_KEY") {
            generation.api_key = api_key;
        }
        if let Some(model) = lookup("GENERATION_MODEL") {
            generation.model = model;
        }
        if let Some(max) = lookup("GENERATION_MAX_NEW_TOKENS") {
            generation.max_new_tokens = parse_var("GENERATION_MAX_NEW_TOKENS", &max)?;
        }
    }

    Ok(())
}

pub fn validate(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        return Err(Error::config("server.port must be non-zero"));
    }
    if config.server.request_timeout_secs == 0 {
        return Err(Error::config("server.request_timeout_secs must be positive"));
    }
    if config.embedding.max_length == 0 {
        return Err(Error::config("embedding.max_length must be positive"));
    }
    if config.embedding.workers == 0 {
        return Err(Error::config("embedding.workers must be positive"));
    }
    if config.embedding.device == Device::Cuda && !cfg!(feature = "cuda") {
        return Err(Error::config(
            "embedding.device 'cuda' requires a build with the 'cuda' feature",
        ));
    }

    match (config.gateway, config.generation.as_ref()) {
        (GatewayKind::Chat, None) => {
            return Err(Error::config(
                "chat gateway requires a 'generation' section (or GENERATION_BASE_URL)",
            ));
        }
        (_, Some(generation)) => {
            if generation.max_new_tokens == 0 {
                return Err(Error::config("generation.max_new_tokens must be positive"));
            }
            if generation.workers == 0 {
                return Err(Error::config("generation.workers must be positive"));
            }
            if generation.do_sample
                && !(generation.temperature.is_finite() && generation.temperature > 0.0)
            {
                return Err(Error::config(
                    "generation.temperature must be positive when do_sample is enabled",
                ));
            }
        }
        (GatewayKind::Embedding, None) => {}
    }

    Ok(())
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{} has an invalid value: '{}'", name, value)))
}
