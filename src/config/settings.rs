use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{logging::LoggingConfig, pubsub::DEFAULT_QUEUE_CAPACITY};

/// Ёмкость inbox'а получателя по умолчанию.
pub const DEFAULT_INBOX_CAPACITY: usize = 16;

/// Параметры брокера.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Ёмкость входной очереди.
    pub queue_capacity: usize,
    /// Ёмкость inbox'а, который хост создаёт для каждого пользователя.
    pub inbox_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
        }
    }
}

impl BrokerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Message(
                "broker.queue_capacity must be greater than zero".into(),
            ));
        }
        if self.inbox_capacity == 0 {
            return Err(ConfigError::Message(
                "broker.inbox_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Settings {
    /// Загружает настройки: значения по умолчанию, затем файл (если указан),
    /// затем переменные окружения `CHATCORE_*` (`CHATCORE_BROKER__QUEUE_CAPACITY`).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("broker.queue_capacity", DEFAULT_QUEUE_CAPACITY as u64)?
            .set_default("broker.inbox_capacity", DEFAULT_INBOX_CAPACITY as u64)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let cfg = builder
            .add_source(
                Environment::with_prefix("CHATCORE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = cfg.try_deserialize()?;
        settings.broker.validate()?;
        Ok(settings)
    }
}
