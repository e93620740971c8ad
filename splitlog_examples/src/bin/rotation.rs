//! example_rotation — демонстрация ротации по таймеру
//! Несколько потоков-воркеров пишут во все уровни, файлы переключаются каждые 2 секунды.

use splitlog::{debug, error, fatal, warn, Level, LogConfig, Logger, RotationManager};
use std::thread;
use std::time::Duration;

// Короткие интервалы, чтобы ротация сработала быстро
const FIRST_ROTATION: Duration = Duration::from_secs(1);
const ROTATION_INTERVAL: Duration = Duration::from_secs(2);
const RUN_FOR: Duration = Duration::from_secs(7);

// Структура, моделирующая "класс" потока
pub struct Worker {
    id: u32,
    log: Logger, // клоны логгера пишут в одни и те же файлы
}

impl Worker {
    pub fn new(id: u32, log: Logger) -> Self {
        Self { id, log }
    }

    pub fn run(&self, iterations: u32) {
        for i in 0..iterations {
            debug!(self.log, "Worker {} iteration {}", self.id, i);
            if i % 7 == 0 {
                warn!(self.log, "Worker {} detected odd workload at {}", self.id, i);
            }
            if i % 11 == 0 {
                error!(self.log, "Worker {} encountered a transient error", self.id);
            }
            if i % 50 == 0 {
                fatal!(self.log, "Worker {} pretends to be dying", self.id);
            }
            thread::sleep(Duration::from_millis(20 + self.id as u64 * 5));
        }
    }
}

fn main() {
    let config = LogConfig {
        dir: "logs/rotation".into(),
        filename_format: "%Y_%m_%d_%H_%M_%S".to_owned(),
        first_rotation: Some(FIRST_ROTATION),
        rotation_interval: ROTATION_INTERVAL,
        min_level: Some(Level::Debug),
        ..Default::default()
    };

    let mut manager = RotationManager::new(config);
    if let Err(e) = manager.init() {
        eprintln!("[FATAL] Cannot initialize logging: {}", e);
        std::process::exit(1);
    }
    let log = manager.logger();
    log.info("rotation demo started", &[("interval_secs", "2")]);

    let iterations = (RUN_FOR.as_millis() / 25) as u32;
    let handles: Vec<_> = (0..4)
        .map(|id| {
            let worker = Worker::new(id, log.clone());
            thread::spawn(move || worker.run(iterations))
        })
        .collect();

    // Ожидание завершения всех потоков
    for h in handles {
        let _ = h.join();
    }

    log.info("all workers finished, check logs/rotation", &[]);
    if let Err(e) = manager.shutdown() {
        eprintln!("[WARN] Failed to close log files: {}", e);
    }
}
