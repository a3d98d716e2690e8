use std::path::{Path, PathBuf};

use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::detector::{AnomalyPolicy, DetectorConfig};
use crate::reading::ChannelId;

/// Layered configuration: hardcoded defaults, then `config/default.toml`,
/// then `config/local.toml`, then `SMOKEWATCH_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub producer: ProducerSettings,
    pub detectors: DetectorSettings,
    pub notifier: NotifierSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSettings {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerSettings {
    pub source_file: PathBuf,
    /// Pause between row emissions, simulating sensor cadence. Deliberate;
    /// do not zero this out in production configs.
    pub delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorSettings {
    pub smoker: ChannelSettings,
    pub food_a: ChannelSettings,
    pub food_b: ChannelSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSettings {
    pub capacity: usize,
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierSettings {
    pub mode: NotifierMode,
    /// Flat TOML secrets file for the SMS gateway; when absent, secrets come
    /// from prefixed environment variables instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets_file: Option<PathBuf>,
    pub secrets_env_prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierMode {
    /// Log alerts only; no outbound transport.
    Log,
    /// Deliver through the configured SMS gateway.
    Sms,
}

impl DetectorSettings {
    /// The predicate shape is fixed per channel (endpoint drop for the
    /// smoker, full-window stall for food); only capacity and threshold are
    /// configurable.
    pub fn config_for(&self, channel: ChannelId) -> DetectorConfig {
        let (settings, policy) = match channel {
            ChannelId::Smoker => (
                &self.smoker,
                AnomalyPolicy::Drop {
                    threshold: self.smoker.threshold,
                },
            ),
            ChannelId::FoodA => (
                &self.food_a,
                AnomalyPolicy::Stall {
                    threshold: self.food_a.threshold,
                },
            ),
            ChannelId::FoodB => (
                &self.food_b,
                AnomalyPolicy::Stall {
                    threshold: self.food_b.threshold,
                },
            ),
        };
        DetectorConfig {
            channel,
            capacity: settings.capacity,
            policy,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config".to_string());
        info!("Loading configuration from path: {}", config_path);

        let config = Self::defaults(Config::builder())?
            .add_source(File::with_name(&format!("{}/default", config_path)).required(false))
            .add_source(File::with_name(&format!("{}/local", config_path)).required(false))
            .add_source(config::Environment::with_prefix("SMOKEWATCH").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    pub fn new_from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::defaults(Config::builder())?
            .add_source(File::from(path))
            .build()?;
        config.try_deserialize()
    }

    fn defaults(
        builder: config::builder::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("broker.url", "amqp://localhost:5672/%2f")?
            .set_default("producer.source_file", "smoker-temps.csv")?
            .set_default("producer.delay_secs", 30)?
            .set_default("detectors.smoker.capacity", 5)?
            .set_default("detectors.smoker.threshold", 15.0)?
            .set_default("detectors.food_a.capacity", 20)?
            .set_default("detectors.food_a.threshold", 1.0)?
            .set_default("detectors.food_b.capacity", 20)?
            .set_default("detectors.food_b.threshold", 1.0)?
            .set_default("notifier.mode", "log")?
            .set_default("notifier.secrets_env_prefix", "SMOKEWATCH")
    }
}

pub fn generate_default_config() -> Settings {
    Settings {
        broker: BrokerSettings {
            url: "amqp://localhost:5672/%2f".to_string(),
        },
        producer: ProducerSettings {
            source_file: PathBuf::from("smoker-temps.csv"),
            delay_secs: 30,
        },
        detectors: DetectorSettings {
            smoker: ChannelSettings {
                capacity: 5,
                threshold: 15.0,
            },
            food_a: ChannelSettings {
                capacity: 20,
                threshold: 1.0,
            },
            food_b: ChannelSettings {
                capacity: 20,
                threshold: 1.0,
            },
        },
        notifier: NotifierSettings {
            mode: NotifierMode::Log,
            secrets_file: None,
            secrets_env_prefix: "SMOKEWATCH".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_deployment_table() {
        let settings = generate_default_config();
        let smoker = settings.detectors.config_for(ChannelId::Smoker);
        assert_eq!(smoker.capacity, 5);
        assert_eq!(smoker.policy, AnomalyPolicy::Drop { threshold: 15.0 });

        for channel in [ChannelId::FoodA, ChannelId::FoodB] {
            let food = settings.detectors.config_for(channel);
            assert_eq!(food.capacity, 20);
            assert_eq!(food.policy, AnomalyPolicy::Stall { threshold: 1.0 });
        }
        assert_eq!(settings.producer.delay_secs, 30);
    }
}
