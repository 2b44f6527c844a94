//! CLI configuration loading and credential resolution.

use anyhow::{Context, bail};
use promptbatch_abstraction::BatchApi;
use promptbatch_client::OpenAIBatchClient;
use promptbatch_core::batch::RequestConfig;
use promptbatch_core::storage::keys;
use promptbatch_core::{CliConfig, SettingsStore};
use std::sync::Arc;
use tracing::debug;

use crate::commands::RequestArgs;

/// Environment variable holding the service credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Everything a command needs from the environment.
///
/// Configuration precedence:
/// 1. CLI arguments (handled by clap)
/// 2. Environment variables
/// 3. Local config file (./.promptbatchrc)
/// 4. Global config file (~/.promptbatch/config.toml)
/// 5. Defaults
pub struct CliContext {
    /// Merged configuration.
    pub config: CliConfig,
    /// Settings and template store.
    pub store: SettingsStore,
    api_key_flag: Option<String>,
}

impl CliContext {
    /// Load configuration and open the settings store.
    pub fn load(api_key_flag: Option<String>, api_base_flag: Option<String>) -> anyhow::Result<Self> {
        let mut config = CliConfig::discover_and_load().context("Failed to load configuration")?;
        if let Some(base) = api_base_flag {
            config.api_base = Some(base);
        }

        Ok(Self { config, store: SettingsStore::open_default(), api_key_flag })
    }

    /// Resolve the credential: `--api-key`, then `OPENAI_API_KEY`, then the stored setting.
    pub fn api_key(&self) -> anyhow::Result<String> {
        if let Some(key) = self.api_key_flag.as_ref().filter(|k| !k.is_empty()) {
            debug!(source = "flag", "Using API key");
            return Ok(key.clone());
        }
        if let Some(key) = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()) {
            debug!(source = "env", "Using API key");
            return Ok(key);
        }
        if let Some(key) = self.store.get_setting(keys::API_KEY)?.filter(|k| !k.is_empty()) {
            debug!(source = "settings", "Using API key");
            return Ok(key);
        }
        bail!(
            "No API key found. Pass --api-key, set {}, or run `promptbatch settings set api_key <key>`",
            API_KEY_ENV
        )
    }

    /// Build the batch service client.
    pub fn batch_api(&self) -> anyhow::Result<Arc<dyn BatchApi>> {
        let mut client = OpenAIBatchClient::with_api_key(self.api_key()?);
        if let Some(ref base) = self.config.api_base {
            client = client.with_base_url(base.clone());
        }
        debug!(base_url = client.base_url(), "Created batch client");
        Ok(Arc::new(client))
    }

    /// Resolve request parameters: flags first, then stored settings, then defaults.
    ///
    /// Numbers are coerced the lenient way: an unparseable temperature becomes
    /// 0 and an unparseable token limit becomes 1000.
    pub fn request_config(&self, args: &RequestArgs) -> anyhow::Result<RequestConfig> {
        let setting = |key: &str| self.store.get_setting(key);

        let model = match &args.model {
            Some(model) => model.clone(),
            None => setting(keys::MODEL)?.unwrap_or_else(|| RequestConfig::default().model),
        };
        let temperature = match &args.temperature {
            Some(t) => t.clone(),
            None => setting(keys::TEMPERATURE)?.unwrap_or_default(),
        };
        let max_tokens = match &args.max_tokens {
            Some(m) => m.clone(),
            None => setting(keys::MAX_TOKENS)?.unwrap_or_default(),
        };
        let system_message = if let Some(system) = &args.system {
            system.clone()
        } else if let Some(name) = &args.template {
            self.store
                .get_template(name)?
                .with_context(|| format!("Template '{}' not found", name))?
                .content
        } else {
            setting(keys::SYSTEM_MESSAGE)?.unwrap_or_default()
        };

        let mut config = RequestConfig::from_raw(model, &temperature, &max_tokens, system_message);
        if let Some(ref endpoint) = self.config.batch.endpoint {
            config.endpoint = endpoint.clone();
        }
        Ok(config)
    }
}
