use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::level::{Level, LevelFilter};
use crate::stream::{FileStream, RotatableStream};

const SLOTS: usize = Level::ALL.len();

type Slot = RwLock<Option<Arc<FileStream>>>;

/// Раскладывает записи по файлам своего уровня: `<dir>/<level>/<basename>.log`.
///
/// Набор слотов фиксируется при создании по текущему порогу фильтра. Слоты
/// ниже порога не создаются никогда, даже если порог потом опустят.
pub struct LevelRouter {
    default_level: Level,
    filter: LevelFilter,
    slots: [Option<Slot>; SLOTS],
}

impl LevelRouter {
    pub fn new<P: AsRef<Path>>(
        default_level: Level,
        dir: P,
        basename: &str,
        filter: &LevelFilter,
    ) -> Self {
        let dir = dir.as_ref();
        let threshold = filter.get();

        let slots = std::array::from_fn(|i| {
            let level = Level::ALL[i];
            // ниже порога записи отсекаются ещё в логгере, слот не нужен
            if level >= threshold {
                let stream = FileStream::new(level_dir(dir, level), basename);
                Some(RwLock::new(Some(Arc::new(stream))))
            } else {
                None
            }
        });

        LevelRouter {
            default_level,
            filter: filter.clone(),
            slots,
        }
    }

    /// Поток уровня, если его слот существует и ещё не закрыт
    pub fn stream(&self, level: Level) -> Option<Arc<FileStream>> {
        self.slots
            .get(level.index())?
            .as_ref()
            .and_then(|slot| slot.read().clone())
    }
}

impl RotatableStream for LevelRouter {
    fn write_level(&self, level: Level, buf: &[u8]) -> Result<usize> {
        let Some(Some(slot)) = self.slots.get(level.index()) else {
            return Ok(0);
        };

        let stream = slot.read().clone();
        match stream {
            Some(stream) => match stream.write(buf) {
                // поток закрыли, пока запись шла к нему: то же правило, что и для пустого слота
                Err(Error::Unavailable) if stream.is_closed() && self.filter.enabled(level) => {
                    Ok(0)
                }
                res => res,
            },
            None if !self.filter.enabled(level) => Err(Error::Unavailable),
            None => Ok(0),
        }
    }

    fn write(&self, buf: &[u8]) -> Result<usize> {
        self.write_level(self.default_level, buf)
    }

    fn rotate(&self, basename: &str) -> Result<()> {
        let mut first_err = None;
        for level in Level::ALL {
            if !self.filter.enabled(level) {
                continue;
            }
            if let Some(stream) = self.stream(level) {
                if let Err(e) = stream.rotate(basename) {
                    first_err.get_or_insert(e);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn close(&self) -> Result<()> {
        let mut first_err = None;
        for slot in self.slots.iter().flatten() {
            let detached = slot.write().take();
            if let Some(stream) = detached {
                if let Err(e) = stream.close() {
                    first_err.get_or_insert(e);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Каталог уровня. У `NoLevel` имя пустое, его файлы лежат в корне.
pub fn level_dir(root: &Path, level: Level) -> PathBuf {
    match level {
        Level::NoLevel => root.to_path_buf(),
        _ => root.join(level.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn writes_land_in_their_level_directory() {
        let tmp = TempDir::new().unwrap();
        let filter = LevelFilter::new(Level::Trace);
        let router = LevelRouter::new(Level::Info, tmp.path(), "stamp.struct", &filter);

        router.write_level(Level::Error, b"boom\n").unwrap();
        router.write(b"plain\n").unwrap();
        router.write_level(Level::NoLevel, b"bare\n").unwrap();

        let read = |p: PathBuf| fs::read_to_string(p).unwrap();
        assert_eq!(read(tmp.path().join("error/stamp.struct.log")), "boom\n");
        assert_eq!(read(tmp.path().join("info/stamp.struct.log")), "plain\n");
        assert_eq!(read(tmp.path().join("stamp.struct.log")), "bare\n");

        // в остальные уровни ничего не писали, каталогов нет
        let untouched = [
            Level::Trace,
            Level::Debug,
            Level::Warn,
            Level::Fatal,
            Level::Panic,
        ];
        for level in untouched {
            assert!(!tmp.path().join(level.as_str()).exists(), "{}", level);
        }
    }

    #[test]
    fn below_threshold_is_dropped_silently() {
        let tmp = TempDir::new().unwrap();
        let filter = LevelFilter::new(Level::Info);
        let router = LevelRouter::new(Level::Info, tmp.path(), "s", &filter);

        assert_eq!(router.write_level(Level::Trace, b"t\n").unwrap(), 0);
        assert_eq!(router.write_level(Level::Debug, b"d\n").unwrap(), 0);
        assert_eq!(router.write_level(Level::Disabled, b"x\n").unwrap(), 0);
        assert!(router.stream(Level::Debug).is_none());

        // Порог опустили после создания: слотов это не добавляет
        filter.set(Level::Trace);
        assert_eq!(router.write_level(Level::Debug, b"d\n").unwrap(), 0);
        router.rotate("t").unwrap();

        assert!(!tmp.path().join("trace").exists());
        assert!(!tmp.path().join("debug").exists());
    }

    #[test]
    fn closed_slot_reports_unavailable_only_below_current_threshold() {
        let tmp = TempDir::new().unwrap();
        let filter = LevelFilter::new(Level::Debug);
        let router = LevelRouter::new(Level::Info, tmp.path(), "s", &filter);

        router.close().unwrap();
        router.close().unwrap();

        assert_eq!(router.write_level(Level::Debug, b"d\n").unwrap(), 0);

        filter.set(Level::Warn);
        assert!(matches!(
            router.write_level(Level::Debug, b"d\n"),
            Err(Error::Unavailable)
        ));
        assert_eq!(router.write_level(Level::Error, b"e\n").unwrap(), 0);
    }

    #[test]
    fn rotate_follows_current_threshold() {
        let tmp = TempDir::new().unwrap();
        let filter = LevelFilter::new(Level::Trace);
        let router = LevelRouter::new(Level::Info, tmp.path(), "a", &filter);

        router.write_level(Level::Debug, b"1\n").unwrap();
        router.write_level(Level::Error, b"1\n").unwrap();

        // debug теперь ниже порога: его поток не ротируется
        filter.set(Level::Info);
        router.rotate("b").unwrap();

        let path_of = |level| router.stream(level).unwrap().path();
        assert_eq!(path_of(Level::Error), tmp.path().join("error/b.log"));
        assert_eq!(path_of(Level::Debug), tmp.path().join("debug/a.log"));
        assert!(!tmp.path().join("error/b.log").exists());
    }

    #[test]
    fn stream_closed_under_a_writer_follows_current_threshold() {
        let tmp = TempDir::new().unwrap();
        let filter = LevelFilter::new(Level::Debug);
        let router = LevelRouter::new(Level::Info, tmp.path(), "s", &filter);

        // Поток закрыт, но ещё сидит в слоте: так видит его писатель,
        // успевший взять ссылку до `close` роутера
        router.stream(Level::Debug).unwrap().close().unwrap();
        router.stream(Level::Error).unwrap().close().unwrap();

        assert_eq!(router.write_level(Level::Debug, b"d\n").unwrap(), 0);

        filter.set(Level::Warn);
        assert!(matches!(
            router.write_level(Level::Debug, b"d\n"),
            Err(Error::Unavailable)
        ));
        assert_eq!(router.write_level(Level::Error, b"e\n").unwrap(), 0);
        assert!(!tmp.path().join("debug").exists());
    }

    #[test]
    fn close_races_with_writers_and_with_itself() {
        const WRITERS: usize = 8;
        const LINES: usize = 500;
        const CLOSERS: usize = 4;

        let tmp = TempDir::new().unwrap();
        let filter = LevelFilter::new(Level::Trace);
        let router = Arc::new(LevelRouter::new(Level::Info, tmp.path(), "s", &filter));
        let start = Arc::new(Barrier::new(WRITERS + CLOSERS));

        let writers: Vec<_> = (0..WRITERS)
            .map(|w| {
                let router = Arc::clone(&router);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    let mut landed = 0;
                    for i in 0..LINES {
                        for level in Level::ALL {
                            let line = format!("{}-{}-{}\n", w, i, level);
                            let n = router.write_level(level, line.as_bytes()).unwrap();
                            if n > 0 {
                                assert_eq!(n, line.len());
                                landed += 1;
                            }
                        }
                    }
                    landed
                })
            })
            .collect();

        let closers: Vec<_> = (0..CLOSERS)
            .map(|_| {
                let router = Arc::clone(&router);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    thread::sleep(Duration::from_millis(2));
                    router.close()
                })
            })
            .collect();

        for c in closers {
            c.join().unwrap().unwrap();
        }
        let landed: usize = writers.into_iter().map(|w| w.join().unwrap()).sum();

        for level in Level::ALL {
            assert!(router.stream(level).is_none(), "{}", level);
        }

        // всё, о чём писателю ответили успехом, лежит в файлах целыми строками
        let mut lines = 0;
        for level in Level::ALL {
            let path = level_dir(tmp.path(), level).join("s.log");
            if let Ok(contents) = fs::read_to_string(&path) {
                assert!(contents.is_empty() || contents.ends_with('\n'));
                lines += contents.lines().count();
            }
        }
        assert_eq!(lines, landed);
    }
}
