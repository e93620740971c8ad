// example_error_init — пример с ошибкой инициализации

use splitlog::{LogConfig, RotationManager};

const APP_NAME: &str = "example_error_init";

fn main() {
    // 1. Преамбула: каталог, который создать нельзя
    let log_dir = "/proc/forbidden"; // Недоступная директория
    let config = LogConfig {
        dir: log_dir.into(),
        system_log: Some(APP_NAME.to_owned()),
        ..Default::default()
    };

    // 2. Инициализация: ошибка здесь прерывает запуск
    let mut manager = RotationManager::new(config);
    if let Err(e) = manager.init() {
        eprintln!("[FATAL] Failed to initialize logging in {}: {}", log_dir, e);
        std::process::exit(1);
    }

    // 3. Основной код (не достигается)
    splitlog::ginfo!("This will not be logged");
}
