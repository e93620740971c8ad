use chrono::{DateTime, Local};
use crossbeam_channel::{select, tick, Receiver, Sender, TryRecvError};
use std::fmt::Write as _;
use std::fs;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::LogConfig;
use crate::diag;
use crate::error::{Error, Result};
use crate::level::LevelFilter;
use crate::logger::{set_global_logger, Logger};
use crate::router::LevelRouter;
use crate::sink::{ConsoleOut, ConsoleSink, FanOut, StructSink};
use crate::stream::{FileStream, RotatableStream};

// ===== Набор назначений =====

#[derive(Clone)]
struct Streams {
    structured: Arc<dyn RotatableStream>,
    console: Arc<FileStream>,
}

impl Streams {
    /// Ротирует оба назначения. Сбой одного не мешает второму,
    /// каждый сбой уходит в диагностику.
    fn rotate(&self, stamp: &str) -> Result<()> {
        let mut first_err = None;

        if let Err(e) = self.console.rotate(&format!("{}.console", stamp)) {
            diag::warn(&format!("unable to rotate console log file: {}", e));
            first_err.get_or_insert(e);
        }
        if let Err(e) = self.structured.rotate(&format!("{}.struct", stamp)) {
            diag::warn(&format!("unable to rotate structure log file: {}", e));
            first_err.get_or_insert(e);
        }

        first_err.map_or(Ok(()), Err)
    }

    fn close(&self) -> Result<()> {
        let console = self.console.close();
        let structured = self.structured.close();
        console.and(structured)
    }
}

fn stamp(format: &str, now: DateTime<Local>) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", now.format(format))
        .map_err(|_| Error::Configuration(format!("invalid filename-format: {:?}", format)))?;
    Ok(out)
}

// ===== Фоновая ротация =====

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

struct RotationLoop {
    streams: Streams,
    format: String,
    first_rotation: Duration,
    interval: Duration,
    stop: Receiver<()>,
}

enum Event {
    Tick,
    Stop,
}

impl RotationLoop {
    fn run(self) {
        let mut ticker = tick(self.first_rotation);
        let mut pending_first = true;

        loop {
            let event = select! {
                recv(self.stop) -> _ => Event::Stop,
                recv(ticker) -> _ => Event::Tick,
            };

            if let Event::Stop = event {
                return;
            }
            // тик мог совпасть с остановкой: после стопа тики не обрабатываем
            if !matches!(self.stop.try_recv(), Err(TryRecvError::Empty)) {
                return;
            }

            if pending_first {
                pending_first = false;
                ticker = tick(self.interval);
            }

            match stamp(&self.format, Local::now()) {
                Ok(stamp) => {
                    let _ = self.streams.rotate(&stamp);
                }
                Err(e) => diag::warn(&format!("unable to build rotated file name: {}", e)),
            }
        }
    }
}

// ===== Менеджер ротации =====

/// Владеет файлами лога, собирает из них [`Logger`] и по таймеру
/// переключает их на новые имена.
///
/// Первая ротация случается через `first_rotation`, дальше каждые
/// `rotation_interval`. Файлы создаются лениво, поэтому в окне без записей
/// данного уровня файла этого уровня не появляется.
pub struct RotationManager {
    config: LogConfig,
    filter: LevelFilter,
    streams: Option<Streams>,
    logger: Logger,
    worker: Option<Worker>,
}

impl RotationManager {
    /// Менеджер с глобальным порогом уровней
    pub fn new(config: LogConfig) -> Self {
        Self::with_filter(config, LevelFilter::global())
    }

    pub fn with_filter(config: LogConfig, filter: LevelFilter) -> Self {
        RotationManager {
            config,
            filter,
            streams: None,
            logger: Logger::disabled(),
            worker: None,
        }
    }

    /// Создаёт назначения, собирает логгер и запускает фоновую ротацию.
    /// Ошибка здесь означает, что логирование поднять нельзя.
    pub fn init(&mut self) -> Result<()> {
        if self.streams.is_some() {
            return Err(Error::Configuration(
                "rotation manager is already initialized".to_owned(),
            ));
        }
        self.config.validate()?;

        if let Some(min) = self.config.min_level {
            self.filter.set(min);
        }
        if let Some(ref ident) = self.config.system_log {
            diag::init_system_logger(ident);
        }

        let dir = &self.config.dir;
        fs::create_dir_all(dir).map_err(|source| Error::CreateDirectory {
            path: dir.clone(),
            source,
        })?;

        let now = Local::now();
        let filename = stamp(&self.config.filename_format, now)?;
        let streams = self.create_streams(&filename);
        let logger = self.compose(&streams);

        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let rotation = RotationLoop {
            streams: streams.clone(),
            format: self.config.filename_format.clone(),
            first_rotation: self.config.first_rotation_delay(now),
            interval: self.config.rotation_interval,
            stop: stop_rx,
        };
        let handle = thread::Builder::new()
            .name("splitlog-rotation".to_owned())
            .spawn(move || rotation.run())?;

        self.streams = Some(streams);
        self.logger = logger;
        self.worker = Some(Worker {
            stop: stop_tx,
            handle,
        });
        Ok(())
    }

    fn create_streams(&self, filename: &str) -> Streams {
        let struct_name = format!("{}.struct", filename);
        let structured: Arc<dyn RotatableStream> = if self.config.split_level {
            Arc::new(LevelRouter::new(
                self.config.default_level,
                &self.config.dir,
                &struct_name,
                &self.filter,
            ))
        } else {
            Arc::new(FileStream::new(&self.config.dir, &struct_name))
        };
        let console = Arc::new(FileStream::new(
            &self.config.dir,
            &format!("{}.console", filename),
        ));
        Streams {
            structured,
            console,
        }
    }

    fn compose(&self, streams: &Streams) -> Logger {
        let mut fan = FanOut::new();
        fan.push(StructSink::new(Arc::clone(&streams.structured)));
        fan.push(ConsoleSink::new(
            ConsoleOut::Stream(streams.console.clone()),
            false,
        ));
        // вывод в stdout
        if self.config.console {
            fan.push(ConsoleSink::new(ConsoleOut::Stdout, self.config.color));
        }
        Logger::new(fan, self.filter.clone())
    }

    /// Логгер поверх текущих назначений; до `init` выключенный
    pub fn logger(&self) -> Logger {
        self.logger.clone()
    }

    /// Делает логгер менеджера глобальным (см. [`crate::logger()`])
    pub fn install_global(&self) {
        set_global_logger(self.logger());
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Внеочередная ротация с новым штампом времени
    pub fn rotate_now(&self) -> Result<()> {
        let Some(ref streams) = self.streams else {
            return Err(Error::Rotation(
                "rotation manager is not initialized".to_owned(),
            ));
        };
        let stamp = stamp(&self.config.filename_format, Local::now())?;
        streams.rotate(&stamp)
    }

    /// Останавливает фоновую ротацию. Начатая ротация доводится до конца.
    /// Файлы остаются открытыми, логгер продолжает писать в последние.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        drop(worker.stop);
        if worker.handle.join().is_err() {
            diag::error("rotation thread panicked");
        }
    }

    /// Остановка и закрытие всех файлов
    pub fn shutdown(&mut self) -> Result<()> {
        self.stop();
        match self.streams {
            Some(ref streams) => streams.close(),
            None => Ok(()),
        }
    }
}

impl Default for RotationManager {
    fn default() -> Self {
        RotationManager::new(LogConfig::default())
    }
}

impl Drop for RotationManager {
    fn drop(&mut self) {
        self.stop();
    }
}
