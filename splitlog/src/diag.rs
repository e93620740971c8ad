//! Диагностика самого логгера: куда сообщать, когда не удалось писать
//! или ротировать. Всегда stderr, плюс системный лог, если он включён.

use once_cell::sync::Lazy;
use parking_lot::Mutex;

// ===== Системный логгер (платформозависимо) =====

#[cfg(target_os = "linux")]
type SystemLogger = syslog::Logger<syslog::LoggerBackend, syslog::Formatter3164>;

#[cfg(not(target_os = "linux"))]
type SystemLogger = ();

static SYSTEM_LOGGER: Lazy<Mutex<Option<SystemLogger>>> = Lazy::new(|| Mutex::new(None));

#[derive(Debug, Clone, Copy)]
enum Severity {
    Warning,
    Error,
}

/// Подключает системный лог под именем `ident`.
/// Возвращает `false`, если на этой платформе или в этом окружении он недоступен.
#[cfg(target_os = "linux")]
pub fn init_system_logger(ident: &str) -> bool {
    let formatter = syslog::Formatter3164 {
        facility: syslog::Facility::LOG_USER,
        hostname: None,
        process: ident.to_owned(),
        pid: std::process::id(),
    };
    match syslog::unix(formatter) {
        Ok(logger) => {
            *SYSTEM_LOGGER.lock() = Some(logger);
            true
        }
        Err(e) => {
            eprintln!("[splitlog] WARN system log unavailable: {}", e);
            false
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn init_system_logger(_ident: &str) -> bool {
    false
}

pub(crate) fn warn(msg: &str) {
    report(Severity::Warning, msg);
}

pub(crate) fn error(msg: &str) {
    report(Severity::Error, msg);
}

fn report(severity: Severity, msg: &str) {
    let tag = match severity {
        Severity::Warning => "WARN",
        Severity::Error => "ERROR",
    };
    eprintln!("[splitlog] {} {}", tag, msg);

    if let Some(ref mut logger) = *SYSTEM_LOGGER.lock() {
        report_to_system(logger, severity, msg);
    }
}

#[cfg(target_os = "linux")]
fn report_to_system(logger: &mut SystemLogger, severity: Severity, msg: &str) {
    let _ = match severity {
        Severity::Warning => logger.warning(msg),
        Severity::Error => logger.err(msg),
    };
}

#[cfg(not(target_os = "linux"))]
fn report_to_system(_logger: &mut SystemLogger, _severity: Severity, _msg: &str) {}
