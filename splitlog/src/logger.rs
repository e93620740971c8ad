use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::diag;
use crate::level::{Level, LevelFilter};
use crate::sink::{Fields, Record, Sink};

// ===== Основной логгер =====

/// То, чем пользуется прикладной код. Клонируется дёшево, все клоны пишут
/// в один и тот же набор получателей.
///
/// Ошибки записи наружу не выходят: бизнес-логика не должна падать из-за
/// логов. Они уходят в диагностику (stderr, системный лог).
#[derive(Clone)]
pub struct Logger {
    sink: Option<Arc<dyn Sink>>,
    filter: LevelFilter,
}

impl Logger {
    pub fn new<S: Sink + 'static>(sink: S, filter: LevelFilter) -> Self {
        Logger {
            sink: Some(Arc::new(sink)),
            filter,
        }
    }

    /// Логгер, который ничего никуда не пишет
    pub fn disabled() -> Self {
        Logger {
            sink: None,
            filter: LevelFilter::global(),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.sink.is_none()
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.sink.is_some() && self.filter.enabled(level)
    }

    pub fn emit(&self, level: Level, message: &str, fields: Fields) {
        let Some(ref sink) = self.sink else {
            return;
        };
        if !self.filter.enabled(level) {
            return;
        }

        let record = Record::new(level, message, fields);
        if let Err(e) = sink.emit(&record) {
            diag::error(&format!("could not write {} record: {}", level.label(), e));
        }
    }

    /// Запись с контекстом из пар ключ-значение
    pub fn with_context(&self, level: Level, message: &str, context: &[(&str, &str)]) {
        if !self.enabled(level) {
            return;
        }
        let fields = context
            .iter()
            .map(|(k, v)| ((*k).to_owned(), Value::from(*v)))
            .collect();
        self.emit(level, message, fields);
    }

    /// Для макросов: форматированное сообщение без полей
    pub fn log(&self, level: Level, args: fmt::Arguments) {
        if !self.enabled(level) {
            return;
        }
        self.emit(level, &args.to_string(), Fields::new());
    }

    pub fn trace(&self, message: &str, context: &[(&str, &str)]) {
        self.with_context(Level::Trace, message, context);
    }

    pub fn debug(&self, message: &str, context: &[(&str, &str)]) {
        self.with_context(Level::Debug, message, context);
    }

    pub fn info(&self, message: &str, context: &[(&str, &str)]) {
        self.with_context(Level::Info, message, context);
    }

    pub fn warn(&self, message: &str, context: &[(&str, &str)]) {
        self.with_context(Level::Warn, message, context);
    }

    pub fn error(&self, message: &str, context: &[(&str, &str)]) {
        self.with_context(Level::Error, message, context);
    }

    pub fn fatal(&self, message: &str, context: &[(&str, &str)]) {
        self.with_context(Level::Fatal, message, context);
    }

    /// Только пишет запись уровня panic, сам процесс не роняет
    pub fn panic(&self, message: &str, context: &[(&str, &str)]) {
        self.with_context(Level::Panic, message, context);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Logger::disabled()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("disabled", &self.is_disabled())
            .field("min_level", &self.filter.get())
            .finish()
    }
}

// ===== Глобальный логгер =====

static GLOBAL_LOGGER: Lazy<RwLock<Option<Logger>>> = Lazy::new(|| RwLock::new(None));

pub fn set_global_logger(logger: Logger) {
    *GLOBAL_LOGGER.write() = Some(logger);
}

/// Глобальный логгер; до установки выключенный
pub fn logger() -> Logger {
    GLOBAL_LOGGER.read().clone().unwrap_or_default()
}

// ===== Макросы =====

#[macro_export]
macro_rules! log {
    ($logger:expr, $($arg:tt)*) => {{
        $logger.log($crate::Level::NoLevel, std::format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)*) => {{
        $logger.log($crate::Level::Trace, std::format_args!($($arg)*));
    }};
}
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)*) => {{
        $logger.log($crate::Level::Debug, std::format_args!($($arg)*));
    }};
}
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)*) => {{
        $logger.log($crate::Level::Info, std::format_args!($($arg)*));
    }};
}
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)*) => {{
        $logger.log($crate::Level::Warn, std::format_args!($($arg)*));
    }};
}
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)*) => {{
        $logger.log($crate::Level::Error, std::format_args!($($arg)*));
    }};
}
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)*) => {{
        $logger.log($crate::Level::Fatal, std::format_args!($($arg)*));
    }};
}

// Те же макросы через глобальный логгер

#[macro_export]
macro_rules! glog {
    ($($arg:tt)*) => {{
        $crate::logger().log($crate::Level::NoLevel, std::format_args!($($arg)*));
    }};
}
#[macro_export]
macro_rules! gtrace {
    ($($arg:tt)*) => {{
        $crate::logger().log($crate::Level::Trace, std::format_args!($($arg)*));
    }};
}
#[macro_export]
macro_rules! gdebug {
    ($($arg:tt)*) => {{
        $crate::logger().log($crate::Level::Debug, std::format_args!($($arg)*));
    }};
}
#[macro_export]
macro_rules! ginfo {
    ($($arg:tt)*) => {{
        $crate::logger().log($crate::Level::Info, std::format_args!($($arg)*));
    }};
}
#[macro_export]
macro_rules! gwarn {
    ($($arg:tt)*) => {{
        $crate::logger().log($crate::Level::Warn, std::format_args!($($arg)*));
    }};
}
#[macro_export]
macro_rules! gerror {
    ($($arg:tt)*) => {{
        $crate::logger().log($crate::Level::Error, std::format_args!($($arg)*));
    }};
}
#[macro_export]
macro_rules! gfatal {
    ($($arg:tt)*) => {{
        $crate::logger().log($crate::Level::Fatal, std::format_args!($($arg)*));
    }};
}
