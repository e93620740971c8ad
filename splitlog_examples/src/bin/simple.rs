// example_simple — простой пример: инициализация, логи по уровням, завершение

use splitlog::{debug, error, info, warn, LogConfig, RotationManager};

const APP_NAME: &str = "example_simple";
const APP_VERSION: &str = "1.0.0";

fn main() {
    // 1. Преамбула: конфигурация из окружения, вывод дублируем в консоль
    let mut config = LogConfig::from_env();
    config.console = true;
    config.system_log = Some(APP_NAME.to_owned());

    // 2. Инициализация: без логов дальше не идём
    let mut manager = RotationManager::new(config);
    if let Err(e) = manager.init() {
        eprintln!("[FATAL] Cannot initialize logging: {}", e);
        std::process::exit(1);
    }
    manager.install_global();

    let log = splitlog::logger();
    log.info("application started", &[("app", APP_NAME), ("version", APP_VERSION)]);

    // 3. Основной код
    debug!(log, "Application initialized successfully");
    debug!(log, "Processing data block #{}", 1);
    warn!(log, "Non-critical issue detected");
    error!(log, "An error occurred, but we continue");
    splitlog::glog!("a record without level goes to the root directory");
    info!(log, "Processing data block #{}", 2);

    // 4. Финальная часть
    log.info("application finished successfully", &[]);
    if let Err(e) = manager.shutdown() {
        eprintln!("[WARN] Failed to close log files: {}", e);
    }
}
