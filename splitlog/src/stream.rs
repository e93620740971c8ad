use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::diag;
use crate::error::{Error, Result};
use crate::level::Level;

/// Назначение, которое умеет ротироваться: одиночный файл или набор
/// файлов по уровням.
pub trait RotatableStream: Send + Sync {
    fn write_level(&self, level: Level, buf: &[u8]) -> Result<usize>;

    fn write(&self, buf: &[u8]) -> Result<usize> {
        self.write_level(Level::NoLevel, buf)
    }

    /// Закрыть текущий файл и переключиться на `basename`.
    /// Сам файл появится только при следующей записи.
    fn rotate(&self, basename: &str) -> Result<()>;

    fn close(&self) -> Result<()>;
}

// ===== Одиночный поток =====

struct Target {
    basename: String,
    // Пустая ячейка: файл ещё не создавался с последней ротации.
    // `Some(None)`: попытка была и не удалась.
    file: OnceCell<Option<File>>,
    closed: bool,
}

/// Один лог-файл `<dir>/<basename>.log`, создаваемый при первой записи.
///
/// Писатели держат блокировку на чтение и пишут параллельно; ротация и
/// закрытие берут её эксклюзивно, поэтому сначала дожидаются всех начатых
/// записей и только потом закрывают файл.
pub struct FileStream {
    dir: PathBuf,
    target: RwLock<Target>,
}

impl FileStream {
    pub fn new<P: AsRef<Path>>(dir: P, basename: &str) -> Self {
        FileStream {
            dir: dir.as_ref().to_path_buf(),
            target: RwLock::new(Target {
                basename: basename.to_owned(),
                file: OnceCell::new(),
                closed: false,
            }),
        }
    }

    /// Путь файла, в который пойдёт следующая запись
    pub fn path(&self) -> PathBuf {
        log_path(&self.dir, &self.target.read().basename)
    }

    /// Открыт ли физический файл прямо сейчас
    pub fn is_open(&self) -> bool {
        matches!(self.target.read().file.get(), Some(Some(_)))
    }

    pub fn is_closed(&self) -> bool {
        self.target.read().closed
    }

    fn open(&self, basename: &str) -> Result<File> {
        fs::create_dir_all(&self.dir).map_err(|source| Error::CreateDirectory {
            path: self.dir.clone(),
            source,
        })?;

        let path = log_path(&self.dir, basename);
        let open_err = |source: io::Error| Error::OpenFile {
            path: path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(open_err)?;
        // Совпадение имени в пределах одного штампа: файл перезаписывается
        file.set_len(0).map_err(open_err)?;
        Ok(file)
    }

    fn release(&self, file: File, basename: &str) {
        if let Err(e) = file.sync_all() {
            diag::warn(&format!(
                "unable to flush {} before close: {}",
                log_path(&self.dir, basename).display(),
                e
            ));
        }
    }
}

impl RotatableStream for FileStream {
    fn write_level(&self, _level: Level, buf: &[u8]) -> Result<usize> {
        let target = self.target.read();
        if target.closed {
            return Err(Error::Unavailable);
        }

        let mut open_err = None;
        let file = target.file.get_or_init(|| match self.open(&target.basename) {
            Ok(file) => Some(file),
            Err(e) => {
                open_err = Some(e);
                None
            }
        });
        if let Some(e) = open_err {
            return Err(e);
        }

        match file {
            Some(file) => {
                let mut handle: &File = file;
                handle.write_all(buf)?;
                Ok(buf.len())
            }
            None => Err(Error::Unavailable),
        }
    }

    fn rotate(&self, basename: &str) -> Result<()> {
        let (previous, old_basename) = {
            let mut target = self.target.write();
            let previous = std::mem::replace(&mut target.file, OnceCell::new());
            let old_basename = std::mem::replace(&mut target.basename, basename.to_owned());
            (previous, old_basename)
        };

        // Файла может и не быть: с прошлой ротации в этот поток ничего не писали.
        // Сброс на диск уже без блокировки, писатели идут в новый файл.
        if let Some(Some(file)) = previous.into_inner() {
            self.release(file, &old_basename);
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let (previous, basename) = {
            let mut target = self.target.write();
            if target.closed {
                return Ok(());
            }
            target.closed = true;
            (std::mem::take(&mut target.file), target.basename.clone())
        };

        if let Some(Some(file)) = previous.into_inner() {
            self.release(file, &basename);
        }
        Ok(())
    }
}

impl Drop for FileStream {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn log_path(dir: &Path, basename: &str) -> PathBuf {
    dir.join(format!("{}.log", basename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn log_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "log"))
            .collect();
        files.sort();
        files
    }

    #[test]
    fn file_is_created_on_first_write() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("deeper");
        let stream = FileStream::new(&dir, "first");

        assert!(!dir.exists());
        assert!(!stream.is_open());

        assert_eq!(stream.write(b"hello\n").unwrap(), 6);
        assert!(stream.is_open());
        assert_eq!(fs::read_to_string(dir.join("first.log")).unwrap(), "hello\n");

        stream.write(b"world\n").unwrap();
        assert_eq!(
            fs::read_to_string(dir.join("first.log")).unwrap(),
            "hello\nworld\n"
        );
    }

    #[test]
    fn rotate_without_writes_leaves_no_empty_file() {
        let tmp = TempDir::new().unwrap();
        let stream = FileStream::new(tmp.path(), "a");

        stream.rotate("b").unwrap();
        stream.rotate("c").unwrap();
        assert!(log_files(tmp.path()).is_empty());

        stream.write(b"x\n").unwrap();
        assert_eq!(log_files(tmp.path()), vec![tmp.path().join("c.log")]);
    }

    #[test]
    fn rotate_switches_target() {
        let tmp = TempDir::new().unwrap();
        let stream = FileStream::new(tmp.path(), "one");

        stream.write(b"1\n").unwrap();
        stream.rotate("two").unwrap();
        assert!(!stream.is_open());
        assert_eq!(stream.path(), tmp.path().join("two.log"));

        stream.write(b"2\n").unwrap();

        assert_eq!(fs::read_to_string(tmp.path().join("one.log")).unwrap(), "1\n");
        assert_eq!(fs::read_to_string(tmp.path().join("two.log")).unwrap(), "2\n");
    }

    #[test]
    fn reused_name_overwrites() {
        let tmp = TempDir::new().unwrap();
        let stream = FileStream::new(tmp.path(), "same");

        stream.write(b"old contents\n").unwrap();
        stream.rotate("same").unwrap();
        stream.write(b"new\n").unwrap();

        assert_eq!(log_files(tmp.path()).len(), 1);
        assert_eq!(fs::read_to_string(tmp.path().join("same.log")).unwrap(), "new\n");
    }

    #[test]
    fn old_file_is_complete_after_rotate_and_close() {
        let tmp = TempDir::new().unwrap();
        let stream = FileStream::new(tmp.path(), "old");
        stream.write(b"1\n").unwrap();

        stream.rotate("new").unwrap();
        // блокировка уже отпущена, старый файл сброшен
        assert!(stream.target.try_write().is_some());
        assert_eq!(fs::read_to_string(tmp.path().join("old.log")).unwrap(), "1\n");

        stream.write(b"2\n").unwrap();
        stream.close().unwrap();
        assert!(stream.target.try_write().is_some());
        assert_eq!(fs::read_to_string(tmp.path().join("new.log")).unwrap(), "2\n");
    }

    #[test]
    fn close_is_idempotent_and_rejects_writes() {
        let tmp = TempDir::new().unwrap();
        let stream = FileStream::new(tmp.path(), "closing");

        stream.write(b"before\n").unwrap();
        stream.close().unwrap();
        stream.close().unwrap();

        assert!(stream.is_closed());
        assert!(matches!(stream.write(b"after\n"), Err(Error::Unavailable)));

        // Ротация закрытого потока только меняет имя
        stream.rotate("later").unwrap();
        assert!(matches!(stream.write(b"after\n"), Err(Error::Unavailable)));
        assert!(!tmp.path().join("later.log").exists());
    }

    #[test]
    fn directory_failure_is_reported_until_next_rotation() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let stream = FileStream::new(blocker.join("logs"), "f");
        assert!(matches!(
            stream.write(b"x\n"),
            Err(Error::CreateDirectory { .. })
        ));
        assert!(matches!(stream.write(b"x\n"), Err(Error::Unavailable)));

        fs::remove_file(&blocker).unwrap();
        stream.rotate("g").unwrap();
        stream.write(b"x\n").unwrap();
        assert!(blocker.join("logs").join("g.log").exists());
    }

    #[test]
    fn concurrent_writes_survive_rotation_intact() {
        const THREADS: usize = 8;
        const LINES: usize = 500;

        let tmp = TempDir::new().unwrap();
        let stream = Arc::new(FileStream::new(tmp.path(), "r0"));

        let writers: Vec<_> = (0..THREADS)
            .map(|t| {
                let stream = Arc::clone(&stream);
                thread::spawn(move || {
                    for i in 0..LINES {
                        let line = format!("{:02}-{:04}-{}\n", t, i, "x".repeat(64));
                        assert_eq!(stream.write(line.as_bytes()).unwrap(), line.len());
                    }
                })
            })
            .collect();

        for r in 1..=20 {
            stream.rotate(&format!("r{}", r)).unwrap();
            thread::yield_now();
        }

        for w in writers {
            w.join().unwrap();
        }
        stream.close().unwrap();

        let mut seen = HashSet::new();
        for file in log_files(tmp.path()) {
            let contents = fs::read_to_string(&file).unwrap();
            assert!(contents.ends_with('\n'));
            for line in contents.lines() {
                let (id, payload) = line.split_at(7);
                assert_eq!(payload, format!("-{}", "x".repeat(64)));
                assert!(seen.insert(id.to_owned()), "duplicate line {}", id);
            }
        }
        assert_eq!(seen.len(), THREADS * LINES);
    }
}
