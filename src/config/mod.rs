// Configuration management module
// Handles the TOML settings file and the credentials taken from the environment

pub mod interactive;
pub mod settings;

#[cfg(test)]
mod tests;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    API_ENV_VAR, API_KEY_VAR, Config, ConfigError, IngestionConfig, LlmConfig, OllamaConfig,
    PineconeConfig, PineconeCredentials, RetrievalConfig, ServerConfig, load_dotenv,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
