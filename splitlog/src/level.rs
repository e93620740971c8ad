use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::error::Error;

// ===== Уровни логгирования =====

/// Уровень записи. Порядок полный: используется и для сравнения с порогом,
/// и как индекс слота в [`LevelRouter`](crate::LevelRouter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Level {
    Trace,
    Debug,
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
    Fatal,
    Panic,
    /// Запись без уровня
    NoLevel,
    /// Граница сверху: как порог отключает всё
    Disabled,
}

impl Level {
    /// Все уровни, для которых бывают записи (всё, что ниже `Disabled`)
    pub const ALL: [Level; 8] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
        Level::Panic,
        Level::NoLevel,
    ];

    /// Имя уровня, оно же имя подкаталога в режиме разбиения.
    /// У `NoLevel` имя пустое.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
            Level::Panic => "panic",
            Level::NoLevel => "",
            Level::Disabled => "disabled",
        }
    }

    /// Метка для человекочитаемого вывода
    pub fn label(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
            Level::Panic => "PANIC",
            Level::NoLevel => "???",
            Level::Disabled => "DISABLED",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    fn from_u8(raw: u8) -> Level {
        match raw {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            5 => Level::Fatal,
            6 => Level::Panic,
            7 => Level::NoLevel,
            _ => Level::Disabled,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            "panic" => Ok(Level::Panic),
            "" | "nolevel" => Ok(Level::NoLevel),
            "disabled" => Ok(Level::Disabled),
            _ => Err(Error::UnknownLevel(s.to_owned())),
        }
    }
}

// ===== Порог фильтрации =====

static GLOBAL_FILTER: Lazy<LevelFilter> = Lazy::new(|| LevelFilter::new(Level::Trace));

/// Минимальный уровень, разделяемый между логгером, роутером и менеджером.
///
/// Клоны смотрят на одно и то же значение. [`LevelFilter::global`] это общий
/// для процесса порог; для изолированных установок (и тестов) можно
/// создать отдельный через [`LevelFilter::new`].
#[derive(Debug, Clone)]
pub struct LevelFilter(Arc<AtomicU8>);

impl LevelFilter {
    pub fn new(min: Level) -> Self {
        LevelFilter(Arc::new(AtomicU8::new(min as u8)))
    }

    pub fn global() -> Self {
        GLOBAL_FILTER.clone()
    }

    pub fn get(&self) -> Level {
        Level::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, level: Level) {
        self.0.store(level as u8, Ordering::SeqCst);
    }

    pub fn enabled(&self, level: Level) -> bool {
        level != Level::Disabled && level >= self.get()
    }
}

pub fn set_global_level(level: Level) {
    GLOBAL_FILTER.set(level);
}

pub fn global_level() -> Level {
    GLOBAL_FILTER.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_totally_ordered() {
        for pair in Level::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(Level::NoLevel < Level::Disabled);
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for level in Level::ALL {
            assert_eq!(level.as_str().parse::<Level>().unwrap(), level);
        }
        assert_eq!("WARNING".parse::<Level>().unwrap(), Level::Warn);
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn filter_clones_share_threshold() {
        let filter = LevelFilter::new(Level::Info);
        let other = filter.clone();

        assert!(!filter.enabled(Level::Debug));
        assert!(filter.enabled(Level::NoLevel));

        other.set(Level::Trace);
        assert!(filter.enabled(Level::Debug));

        other.set(Level::Disabled);
        assert!(!filter.enabled(Level::NoLevel));
        assert!(!filter.enabled(Level::Disabled));
    }
}
