//! Настройки ротации
//!
//! Всё можно задать кодом, переменными окружения `SPLITLOG_*` или TOML-файлом
//! (ключи в kebab-case, длительности в секундах).

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Days, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::level::Level;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LogConfig {
    /// Раскладывать структурный лог по каталогам уровней
    pub split_level: bool,

    /// Уровень для записей, пришедших без уровня через `write`
    pub default_level: Level,

    /// Если задан, выставляется как порог при `init`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_level: Option<Level>,

    /// Корневой каталог логов
    pub dir: PathBuf,

    /// strftime-шаблон для имени файла, например `%Y_%m_%d`.
    ///
    /// Файл с уже существующим именем перезаписывается. С дневным штампом
    /// перезапуск процесса в тот же день стирает записи за этот день;
    /// если это важно, добавьте в шаблон время (`%Y_%m_%d_%H_%M_%S`).
    pub filename_format: String,

    /// Задержка до первой ротации. По умолчанию до ближайшей полуночи.
    #[serde(with = "secs::option", skip_serializing_if = "Option::is_none")]
    pub first_rotation: Option<Duration>,

    /// Интервал между последующими ротациями
    #[serde(with = "secs")]
    pub rotation_interval: Duration,

    /// Дублировать вывод в stdout
    pub console: bool,

    /// Цвета в stdout (в зеркальный файл цвета не пишутся)
    pub color: bool,

    /// Имя для системного лога, куда идут сообщения о сбоях самого логгера
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_log: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            split_level: true,
            default_level: Level::Info,
            min_level: None,
            dir: PathBuf::from("logs"),
            filename_format: "%Y_%m_%d".to_owned(),
            first_rotation: None,
            rotation_interval: DAY,
            console: false,
            color: true,
            system_log: None,
        }
    }
}

impl LogConfig {
    /// Умолчания, поверх которых накладываются переменные окружения
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SPLITLOG_SPLIT_LEVEL") {
            config.split_level = val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("SPLITLOG_DEFAULT_LEVEL") {
            if let Ok(level) = val.parse() {
                config.default_level = level;
            }
        }

        if let Ok(val) = std::env::var("SPLITLOG_MIN_LEVEL") {
            if let Ok(level) = val.parse() {
                config.min_level = Some(level);
            }
        }

        if let Ok(val) = std::env::var("SPLITLOG_DIR") {
            config.dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("SPLITLOG_FILENAME_FORMAT") {
            config.filename_format = val;
        }

        if let Ok(val) = std::env::var("SPLITLOG_FIRST_ROTATION") {
            if let Ok(secs) = val.parse::<u64>() {
                config.first_rotation = Some(Duration::from_secs(secs));
            }
        }

        if let Ok(val) = std::env::var("SPLITLOG_ROTATION_INTERVAL") {
            if let Ok(secs) = val.parse::<u64>() {
                config.rotation_interval = Duration::from_secs(secs);
            }
        }

        if let Ok(val) = std::env::var("SPLITLOG_CONSOLE") {
            config.console = val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("SPLITLOG_COLOR") {
            config.color = val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("SPLITLOG_SYSTEM_LOG") {
            config.system_log = Some(val);
        }

        config
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rotation_interval.is_zero() {
            return Err(Error::Configuration(
                "rotation-interval must be greater than 0".to_owned(),
            ));
        }

        if self.first_rotation.is_some_and(|d| d.is_zero()) {
            return Err(Error::Configuration(
                "first-rotation must be greater than 0".to_owned(),
            ));
        }

        if self.filename_format.trim().is_empty() {
            return Err(Error::Configuration(
                "filename-format must not be empty".to_owned(),
            ));
        }

        if self.filename_format.contains(['/', '\\']) {
            return Err(Error::Configuration(format!(
                "filename-format must not contain path separators: {:?}",
                self.filename_format
            )));
        }

        if StrftimeItems::new(&self.filename_format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::Configuration(format!(
                "invalid filename-format: {:?}",
                self.filename_format
            )));
        }

        if self.default_level == Level::Disabled {
            return Err(Error::Configuration(
                "default-level must be a real level".to_owned(),
            ));
        }

        Ok(())
    }

    /// Фактическая задержка до первой ротации относительно `now`
    pub fn first_rotation_delay(&self, now: DateTime<Local>) -> Duration {
        self.first_rotation
            .unwrap_or_else(|| until_next_midnight(now).unwrap_or(self.rotation_interval))
    }
}

fn until_next_midnight(now: DateTime<Local>) -> Option<Duration> {
    let midnight = now
        .date_naive()
        .checked_add_days(Days::new(1))?
        .and_hms_opt(0, 0, 0)?;
    let midnight = Local.from_local_datetime(&midnight).earliest()?;
    (midnight - now).to_std().ok()
}

/// Длительность как число секунд (дробное допускается)
mod secs {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
            match d {
                Some(d) => super::serialize(d, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
            match Option::<f64>::deserialize(d)? {
                Some(secs) => Duration::try_from_secs_f64(secs)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
