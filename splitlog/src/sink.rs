use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::io::{self, Write as _};
use std::sync::Arc;

use crate::error::Result;
use crate::level::Level;
use crate::stream::RotatableStream;

/// Дополнительные поля записи
pub type Fields = Map<String, Value>;

/// Одна запись лога
#[derive(Debug, Clone)]
pub struct Record {
    pub time: DateTime<Local>,
    pub level: Level,
    pub message: String,
    pub fields: Fields,
}

impl Record {
    pub fn new(level: Level, message: impl Into<String>, fields: Fields) -> Self {
        Record {
            time: Local::now(),
            level,
            message: message.into(),
            fields,
        }
    }
}

/// Получатель записей
pub trait Sink: Send + Sync {
    fn emit(&self, record: &Record) -> Result<()>;
}

// ===== Структурный лог (JSON по строке на запись) =====

#[derive(Serialize)]
struct StructLine<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<&'static str>,
    time: String,
    message: &'a str,
    #[serde(flatten)]
    fields: &'a Fields,
}

pub struct StructSink {
    out: Arc<dyn RotatableStream>,
}

impl StructSink {
    pub fn new(out: Arc<dyn RotatableStream>) -> Self {
        StructSink { out }
    }

    pub fn encode(record: &Record) -> Result<Vec<u8>> {
        let line = StructLine {
            level: match record.level {
                Level::NoLevel => None,
                level => Some(level.as_str()),
            },
            time: record.time.to_rfc3339_opts(SecondsFormat::Millis, false),
            message: &record.message,
            fields: &record.fields,
        };
        let mut buf = serde_json::to_vec(&line)?;
        buf.push(b'\n');
        Ok(buf)
    }
}

impl Sink for StructSink {
    fn emit(&self, record: &Record) -> Result<()> {
        let buf = Self::encode(record)?;
        self.out.write_level(record.level, &buf)?;
        Ok(())
    }
}

// ===== Человекочитаемый вывод =====

pub enum ConsoleOut {
    /// Зеркальный файл консоли
    Stream(Arc<dyn RotatableStream>),
    Stdout,
}

pub struct ConsoleSink {
    out: ConsoleOut,
    color: bool,
}

const RESET: &str = "\x1b[0m";

fn color_code(level: Level) -> &'static str {
    match level {
        Level::Trace => "\x1b[90m",
        Level::Debug => "\x1b[36m",
        Level::Info => "\x1b[32m",
        Level::Warn => "\x1b[33m",
        Level::Error => "\x1b[31m",
        Level::Fatal | Level::Panic => "\x1b[35m",
        Level::NoLevel | Level::Disabled => "",
    }
}

impl ConsoleSink {
    pub fn new(out: ConsoleOut, color: bool) -> Self {
        ConsoleSink { out, color }
    }

    pub fn format_line(record: &Record, color: bool) -> String {
        let mut line = String::with_capacity(64 + record.message.len());
        let _ = write!(line, "{} ", record.time.format("%Y-%m-%d %H:%M:%S%.3f"));

        let label = record.level.label();
        match color_code(record.level) {
            code if color && !code.is_empty() => {
                let _ = write!(line, "{}{}{}", code, label, RESET);
            }
            _ => line.push_str(label),
        }

        line.push(' ');
        line.push_str(&record.message);
        for (key, value) in &record.fields {
            let _ = write!(line, " {}=", key);
            match value {
                Value::String(s) if !s.is_empty() && !s.contains(char::is_whitespace) => {
                    line.push_str(s)
                }
                other => {
                    let _ = write!(line, "{}", other);
                }
            }
        }
        line.push('\n');
        line
    }
}

impl Sink for ConsoleSink {
    fn emit(&self, record: &Record) -> Result<()> {
        let line = Self::format_line(record, self.color);
        match &self.out {
            ConsoleOut::Stream(stream) => {
                stream.write_level(record.level, line.as_bytes())?;
            }
            ConsoleOut::Stdout => {
                io::stdout().lock().write_all(line.as_bytes())?;
            }
        }
        Ok(())
    }
}

// ===== Веер на несколько получателей =====

/// Отдаёт каждую запись всем получателям по очереди.
/// Сбой одного не мешает остальным; наружу уходит первая ошибка.
#[derive(Default)]
pub struct FanOut {
    sinks: Vec<Box<dyn Sink>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: Sink + 'static>(&mut self, sink: S) {
        self.sinks.push(Box::new(sink));
    }

}

impl Sink for FanOut {
    fn emit(&self, record: &Record) -> Result<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.emit(record) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
