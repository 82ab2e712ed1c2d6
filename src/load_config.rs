use crate::config::{Config, FailurePolicy, API_KEY_ENV};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPENROUTER_API_KEY not set in environment variables")]
    MissingApiKey,
    #[error("'{}' is not a valid folder", .0.display())]
    NotADirectory(PathBuf),
    #[error("'{}' is not a readable file", .0.display())]
    NotAFile(PathBuf),
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Optional tuning file. Secrets never live here; the API key is always read
/// from the environment.
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct StaticConfig {
    #[serde(default)]
    output_dir: Option<PathBuf>,
    #[serde(default)]
    llm: LlmSection,
    #[serde(default)]
    pipeline: PipelineSection,
    #[serde(default)]
    render: RenderSection,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct LlmSection {
    endpoint: Option<String>,
    model: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PipelineSection {
    concurrency: Option<usize>,
    max_file_bytes: Option<u64>,
    prompt_context_chars: Option<usize>,
    failure_policy: Option<FailurePolicy>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RenderSection {
    pandoc: Option<PathBuf>,
    pdf_engine: Option<String>,
}

/// Builds the run configuration: the credential from the environment, tunables
/// from the optional YAML file, defaults for everything else.
///
/// A missing credential is not an error here; flows that talk to the chat
/// endpoint reject it when they build their client, before any work starts.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let static_conf = match path {
        Some(path) => read_static_config(path)?,
        None => StaticConfig::default(),
    };

    let api_key = match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => {
            info!("{API_KEY_ENV} found in env");
            Some(key)
        }
        Ok(_) => {
            warn!("{API_KEY_ENV} is set but empty");
            None
        }
        Err(e) => {
            warn!(error = ?e, "{API_KEY_ENV} environment variable not set");
            None
        }
    };

    let mut config = Config {
        api_key,
        ..Config::with_api_key("")
    };
    if let Some(output_dir) = static_conf.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(endpoint) = static_conf.llm.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(model) = static_conf.llm.model {
        config.model = model;
    }
    if let Some(concurrency) = static_conf.pipeline.concurrency {
        if concurrency == 0 {
            error!("pipeline.concurrency must be at least 1");
            return Err(ConfigError::Invalid("pipeline.concurrency must be at least 1".into()));
        }
        config.concurrency = concurrency;
    }
    if let Some(max_file_bytes) = static_conf.pipeline.max_file_bytes {
        config.max_file_bytes = max_file_bytes;
    }
    if let Some(chars) = static_conf.pipeline.prompt_context_chars {
        config.prompt_context_chars = chars;
    }
    if let Some(policy) = static_conf.pipeline.failure_policy {
        config.failure_policy = policy;
    }
    if let Some(pandoc) = static_conf.render.pandoc {
        config.pandoc = pandoc;
    }
    if let Some(engine) = static_conf.render.pdf_engine {
        config.pdf_engine = engine;
    }

    config.trace_loaded();
    Ok(config)
}

fn read_static_config(path: &Path) -> Result<StaticConfig, ConfigError> {
    info!(config_path = ?path, "Loading configuration from file");
    let content = fs::read_to_string(path).map_err(|source| {
        error!(error = ?source, config_path = ?path, "Failed to read config file");
        ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let conf: StaticConfig = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
        ConfigError::Parse(e)
    })?;
    info!(config_path = ?path, "Parsed config YAML successfully");
    Ok(conf)
}

/// Rejects anything that is not an existing directory.
pub fn require_directory(path: &Path) -> Result<(), ConfigError> {
    if path.is_dir() {
        Ok(())
    } else {
        error!(path = %path.display(), "Input path is not a directory");
        Err(ConfigError::NotADirectory(path.to_path_buf()))
    }
}

/// Rejects anything that is not an existing regular file.
pub fn require_file(path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        error!(path = %path.display(), "Input path is not a file");
        Err(ConfigError::NotAFile(path.to_path_buf()))
    }
}
