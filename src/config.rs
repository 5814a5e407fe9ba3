use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::binding::params;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub binding: BindingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingConfig {
    pub provider: String,
    pub repository_id: String,
    pub auth_provider: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub repository_cache_size: Option<i64>,
    pub type_cache_size: Option<i64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            binding: BindingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            provider: "memory".to_string(),
            repository_id: "test".to_string(),
            auth_provider: None,
            user: None,
            password: None,
            repository_cache_size: None,
            type_cache_size: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional config file and
    /// environment variables prefixed with `CMIS_`.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        config = config.add_source(config::File::with_name("config").required(false));

        config = config.add_source(
            config::Environment::with_prefix("CMIS")
                .separator("_")
                .prefix_separator("_"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Gateway session parameters derived from the binding section.
    pub fn binding_parameters(&self) -> HashMap<String, String> {
        let mut parameters = HashMap::new();
        parameters.insert(params::PROVIDER.to_string(), self.binding.provider.clone());
        parameters.insert(
            params::REPOSITORY_ID.to_string(),
            self.binding.repository_id.clone(),
        );
        if let Some(auth_provider) = &self.binding.auth_provider {
            parameters.insert(params::AUTH_PROVIDER.to_string(), auth_provider.clone());
        }
        if let Some(user) = &self.binding.user {
            parameters.insert(params::USER.to_string(), user.clone());
        }
        if let Some(password) = &self.binding.password {
            parameters.insert(params::PASSWORD.to_string(), password.clone());
        }
        if let Some(size) = self.binding.repository_cache_size {
            parameters.insert(params::CACHE_SIZE_REPOSITORIES.to_string(), size.to_string());
        }
        if let Some(size) = self.binding.type_cache_size {
            parameters.insert(params::CACHE_SIZE_TYPES.to_string(), size.to_string());
        }
        parameters
    }
}
