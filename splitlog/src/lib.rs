//! # splitlog
//!
//! Логгер с разбиением по уровням и ротацией файлов по расписанию.
//!
//! Каждая запись уходит сразу в несколько мест: в структурный лог (JSON,
//! общий файл или по файлу на уровень), в зеркальный человекочитаемый файл
//! и, по желанию, в stdout. Фоновый поток по таймеру переключает все файлы
//! на новые имена вида `<штамп>.struct.log` / `<штамп>.console.log`.
//!
//! ```no_run
//! use splitlog::{LogConfig, RotationManager};
//!
//! fn main() -> splitlog::Result<()> {
//!     let mut manager = RotationManager::new(LogConfig::default());
//!     manager.init()?;
//!     manager.install_global();
//!
//!     splitlog::logger().info("server started", &[("port", "8080")]);
//!     splitlog::gwarn!("disk usage {}%", 91);
//!
//!     manager.shutdown()
//! }
//! ```

mod config;
mod diag;
mod error;
mod level;
mod logger;
mod manager;
mod router;
mod sink;
mod stream;

pub use config::LogConfig;
pub use diag::init_system_logger;
pub use error::{Error, Result};
pub use level::{global_level, set_global_level, Level, LevelFilter};
pub use logger::{logger, set_global_logger, Logger};
pub use manager::RotationManager;
pub use router::{level_dir, LevelRouter};
pub use sink::{ConsoleOut, ConsoleSink, FanOut, Fields, Record, Sink, StructSink};
pub use stream::{FileStream, RotatableStream};
