// restate-config/src/lib.rs

use restate_types::{RestateSettings, StorageSettings};
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution.
///
/// Without a file the loader starts from [`RestateSettings::default`];
/// environment overrides and validation apply either way.
pub struct ConfigLoader {
	file_path: Option<PathBuf>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "RESTATE_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_path_buf());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<RestateSettings, ConfigError> {
		let mut settings = match &self.file_path {
			Some(file_path) => self.load_from_file(file_path).await?,
			None => RestateSettings::default(),
		};

		self.apply_env_overrides(&mut settings)?;
		self.validate(&settings)?;

		Ok(settings)
	}

	/// Parses settings from TOML text, applying the same substitution,
	/// overrides and validation as [`ConfigLoader::load`].
	pub fn load_str(&self, content: &str) -> Result<RestateSettings, ConfigError> {
		let mut settings = self.parse(content)?;
		self.apply_env_overrides(&mut settings)?;
		self.validate(&settings)?;
		Ok(settings)
	}

	async fn load_from_file(&self, file_path: &Path) -> Result<RestateSettings, ConfigError> {
		debug!("Reading configuration from {:?}", file_path);
		let content = tokio::fs::read_to_string(file_path).await?;
		self.parse(&content)
	}

	fn parse(&self, content: &str) -> Result<RestateSettings, ConfigError> {
		let substituted_content = self.substitute_env_vars(content)?;

		toml::from_str(&substituted_content).map_err(|e| ConfigError::ParseError(e.to_string()))
	}

	fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
		// Find and replace ${VAR_NAME} patterns outside comment lines
		let re = regex::Regex::new(r"\$\{([^}]+)\}")
			.map_err(|e| ConfigError::ParseError(e.to_string()))?;

		let mut result = String::with_capacity(content.len());
		for line in content.lines() {
			if line.trim_start().starts_with('#') {
				result.push_str(line);
				result.push('\n');
				continue;
			}

			let mut substituted = line.to_string();
			for cap in re.captures_iter(line) {
				let full_match = &cap[0];
				let var_name = &cap[1];

				let env_value = env::var(var_name)
					.map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

				substituted = substituted.replace(full_match, &env_value);
			}
			result.push_str(&substituted);
			result.push('\n');
		}

		Ok(result)
	}

	fn apply_env_overrides(&self, settings: &mut RestateSettings) -> Result<(), ConfigError> {
		if let Ok(log_level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			settings.restate.log_level = log_level;
		}

		if let Ok(delay) = env::var(format!("{}DELAY_MS", self.env_prefix)) {
			settings.restate.delay_ms = delay
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid delay: {}", e)))?;
		}

		if let Ok(path) = env::var(format!("{}STORAGE_PATH", self.env_prefix)) {
			settings.storage = StorageSettings::File {
				path: PathBuf::from(path),
			};
		}

		Ok(())
	}

	fn validate(&self, settings: &RestateSettings) -> Result<(), ConfigError> {
		if settings.restate.delay_ms == 0 {
			return Err(ConfigError::ValidationError(
				"delay_ms must be positive".to_string(),
			));
		}

		if let Some(states) = &settings.restate.states {
			let mut seen = HashSet::new();
			for name in states {
				if name.trim().is_empty() {
					return Err(ConfigError::ValidationError(
						"state names must not be empty".to_string(),
					));
				}
				if !seen.insert(name.as_str()) {
					return Err(ConfigError::ValidationError(format!(
						"duplicate state name: {}",
						name
					)));
				}
			}
		}

		if let StorageSettings::File { path } = &settings.storage {
			if path.as_os_str().is_empty() {
				return Err(ConfigError::ValidationError(
					"storage path must not be empty".to_string(),
				));
			}
		}

		Ok(())
	}
}
