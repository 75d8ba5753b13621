//! 终端彩色日志
//!
//! 日志一律写到标准错误，标准输出只留给扫描结果。

use std::io::{self, Write};
use std::sync::Mutex;

use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

pub struct Logger {
    use_colors: bool,
    max_level: LevelFilter,
    mutex: Mutex<()>,
}

impl Logger {
    pub fn new(max_level: LevelFilter, use_colors: bool) -> Self {
        Logger {
            use_colors,
            max_level,
            mutex: Mutex::new(()),
        }
    }

    fn label(&self, level: Level) -> String {
        let label = match level {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        if !self.use_colors {
            return label.to_string();
        }

        match level {
            Level::Error => label.red().to_string(),
            Level::Warn => label.yellow().to_string(),
            Level::Info => label.blue().to_string(),
            Level::Debug => label.magenta().to_string(),
            Level::Trace => label.normal().to_string(),
        }
    }

    fn format(&self, record: &Record) -> String {
        format!(
            "{} [{}] {}",
            chrono::Local::now().format("%H:%M:%S"),
            self.label(record.level()),
            record.args()
        )
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level && metadata.target().starts_with("rsubrecon")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = self.format(record);
        let _guard = self.mutex.lock();
        let _ = writeln!(io::stderr(), "{}", line);
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// 根据命令行开关初始化日志
pub fn init_logger(verbose: bool, quiet: bool) -> Result<(), SetLoggerError> {
    let level = if quiet {
        LevelFilter::Error
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    log::set_boxed_logger(Box::new(Logger::new(level, true)))?;
    log::set_max_level(level);
    Ok(())
}
