// example_tokio — асинхронный пример с tokio и общим логгером
// Запись синхронная и короткая, поэтому логгер спокойно зовётся прямо из задач

use splitlog::{debug, error, warn, LogConfig, Logger, RotationManager};
use tokio::task;
use tokio::time::{sleep, Duration};

// Асинхронный "воркер"
pub struct Worker {
    id: u32,
    log: Logger,
}

impl Worker {
    pub fn new(id: u32, log: Logger) -> Self {
        Self { id, log }
    }

    pub async fn run(&self) {
        debug!(self.log, "Worker {} started (async)", self.id);

        // Имитация асинхронной работы
        sleep(Duration::from_millis(50 + (self.id as u64) * 100)).await;

        if self.id % 3 == 0 {
            warn!(self.log, "Worker {} has high priority task", self.id);
        }

        if self.id == 2 {
            error!(self.log, "Worker {} failed to process data", self.id);
        }

        self.log.info("worker completed", &[("id", self.id.to_string().as_str())]);
    }
}

#[tokio::main]
async fn main() {
    let config = LogConfig {
        dir: "logs/tokio".into(),
        console: true,
        ..LogConfig::from_env()
    };

    let mut manager = RotationManager::new(config);
    if let Err(e) = manager.init() {
        eprintln!("[FATAL] Cannot initialize logging: {}", e);
        std::process::exit(1);
    }
    let log = manager.logger();

    debug!(log, "Tokio runtime initialized, spawning async tasks...");

    let mut handles = vec![];
    for i in 0..5 {
        let worker = Worker::new(i, log.clone());
        handles.push(task::spawn(async move {
            worker.run().await;
        }));
    }

    // Ждём завершения всех задач
    for h in handles {
        let _ = h.await;
    }

    debug!(log, "All async tasks completed");

    // Закрытие файлов блокирует, уносим его с рантайма
    let closed = task::spawn_blocking(move || manager.shutdown()).await;
    if !matches!(closed, Ok(Ok(()))) {
        eprintln!("[WARN] Failed to close log files");
    }
}
