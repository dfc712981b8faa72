use std::{env, fs, io, path::PathBuf};

use serde::{Deserialize, Serialize};

use super::LoggingError;

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Формат вывода событий.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::InvalidFormat(other.to_string())),
        }
    }
}

/// Период ротации файла логов.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    /// Собственный формат консоли; по умолчанию общий `format`.
    pub format: Option<LogFormat>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FileConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub filename: String,
    pub rotation: Rotation,
    pub format: LogFormat,
}

/// Конфигурация логирования.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Уровень: trace, debug, info, warn, error.
    pub level: String,
    pub format: LogFormat,
    pub console: ConsoleConfig,
    pub file: FileConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            format: None,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from("logs"),
            filename: "chatcore.log".to_string(),
            rotation: Rotation::Daily,
            format: LogFormat::Json,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            console: ConsoleConfig::default(),
            file: FileConfig::default(),
        }
    }
}

impl LoggingConfig {
    /// Директива для `EnvFilter`, например `"chatcore=debug,debug"`.
    pub fn build_filter_directive(&self) -> String {
        let level = self.level.to_ascii_lowercase();
        format!("chatcore={level},{level}")
    }

    /// Переопределения из окружения: `CHATCORE_LOG_LEVEL`,
    /// `CHATCORE_LOG_FORMAT`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("CHATCORE_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(format) = env::var("CHATCORE_LOG_FORMAT") {
            match format.parse() {
                Ok(format) => self.format = format,
                Err(e) => eprintln!("Ignoring CHATCORE_LOG_FORMAT: {e}"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), LoggingError> {
        let level = self.level.to_ascii_lowercase();
        if !LEVELS.contains(&level.as_str()) {
            return Err(LoggingError::InvalidLevel(self.level.clone()));
        }
        if self.file.enabled && self.file.filename.is_empty() {
            return Err(LoggingError::InvalidFile("filename is empty".into()));
        }
        Ok(())
    }

    /// Создаёт каталог логов, если включена запись в файл.
    pub fn ensure_log_dir(&self) -> io::Result<()> {
        if self.file.enabled {
            fs::create_dir_all(&self.file.dir)?;
        }
        Ok(())
    }

    pub fn console_format(&self) -> LogFormat {
        self.console.format.unwrap_or(self.format)
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    /// Тест проверяет директиву фильтра для заданного уровня.
    #[test]
    fn test_filter_directive() {
        let cfg = LoggingConfig {
            level: "DEBUG".into(),
            ..Default::default()
        };
        assert_eq!(cfg.build_filter_directive(), "chatcore=debug,debug");
    }

    /// Тест проверяет валидацию уровня и имени файла.
    #[test]
    fn test_validate() {
        let mut cfg = LoggingConfig::default();
        assert!(cfg.validate().is_ok());

        cfg.level = "verbose".into();
        assert!(matches!(cfg.validate(), Err(LoggingError::InvalidLevel(l)) if l == "verbose"));

        cfg.level = "warn".into();
        cfg.file.enabled = true;
        cfg.file.filename.clear();
        assert!(matches!(cfg.validate(), Err(LoggingError::InvalidFile(_))));
    }

    /// Тест проверяет разбор формата из строки.
    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    /// Тест проверяет, что формат консоли наследует общий, если не задан.
    #[test]
    fn test_console_format_fallback() {
        let mut cfg = LoggingConfig {
            format: LogFormat::Json,
            ..Default::default()
        };
        assert_eq!(cfg.console_format(), LogFormat::Json);

        cfg.console.format = Some(LogFormat::Pretty);
        assert_eq!(cfg.console_format(), LogFormat::Pretty);
    }

    /// Тест проверяет переопределения из переменных окружения.
    #[test]
    #[serial]
    fn test_env_overrides() {
        env::set_var("CHATCORE_LOG_LEVEL", "trace");
        env::set_var("CHATCORE_LOG_FORMAT", "json");

        let mut cfg = LoggingConfig::default();
        cfg.apply_env_overrides();

        env::remove_var("CHATCORE_LOG_LEVEL");
        env::remove_var("CHATCORE_LOG_FORMAT");

        assert_eq!(cfg.level, "trace");
        assert_eq!(cfg.format, LogFormat::Json);
    }

    /// Тест проверяет частичную конфигурацию: отсутствующие поля берутся
    /// по умолчанию.
    #[test]
    fn test_partial_deserialize() {
        let cfg: LoggingConfig =
            serde_json::from_str(r#"{"level":"warn","file":{"enabled":true}}"#).unwrap();

        assert_eq!(cfg.level, "warn");
        assert!(cfg.file.enabled);
        assert_eq!(cfg.file.filename, "chatcore.log");
        assert!(cfg.console.enabled);
    }
}
