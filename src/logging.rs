//! ロギングシステム
//!
//! `log` ファサードの出力先となるロガーを提供する。
//! ライブラリ内部は `log::warn!` などで記録し、出力先の選択はバイナリ側で行う。

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record};

/// ロガー
///
/// * 標準エラー出力（既定）または標準出力へ出力
/// * 追記専用のファイル出力を任意で併用
#[derive(Debug)]
pub struct Logger {
    level: LevelFilter,
    output_stderr: bool,
    output_file: Option<PathBuf>,
    file_lock: Mutex<()>,
}

impl Logger {
    /// デフォルト構築
    pub fn new(level: LevelFilter) -> Self {
        Self {
            level,
            output_stderr: true,
            output_file: None,
            file_lock: Mutex::new(()),
        }
    }

    /// 開発者向けロガー
    pub fn for_development() -> Self {
        Self::new(LevelFilter::Debug)
    }

    /// ログレベルを取得
    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// ログレベルを変更
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// ファイル出力を設定
    pub fn with_file_output<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output_file = Some(path.into());
        self
    }

    /// 標準エラー出力を無効化（標準出力へ切り替え）
    pub fn without_stderr(mut self) -> Self {
        self.output_stderr = false;
        self
    }

    fn should_log(&self, level: Level) -> bool {
        level <= self.level
    }

    fn write_line(&self, message: &str) {
        if self.output_stderr {
            eprintln!("{}", message);
        } else {
            println!("{}", message);
        }

        if let Some(path) = &self.output_file {
            let _guard = self.file_lock.lock();
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
                let _ = writeln!(file, "{}", message);
            }
        }
    }

    fn format(record: &Record<'_>) -> String {
        let tag = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARNING",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        format!("{}: {} in {}", tag, record.args(), record.target())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.should_log(metadata.level())
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            self.write_line(&Self::format(record));
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// グローバルロガーとして登録する
///
/// 既に登録済みの場合は何もせず `false` を返す。
pub fn init(logger: Logger) -> bool {
    let level = logger.level();
    match log::set_boxed_logger(Box::new(logger)) {
        Ok(()) => {
            log::set_max_level(level);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logger_respects_log_level() {
        let logger = Logger::for_development().without_stderr();
        assert!(logger.should_log(Level::Debug));
        assert!(logger.should_log(Level::Error));

        let info_logger = Logger::for_development()
            .with_level(LevelFilter::Info)
            .without_stderr();
        assert!(!info_logger.should_log(Level::Debug));
        assert!(info_logger.should_log(Level::Warn));
    }

    #[test]
    fn logger_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scribe.log");
        let logger = Logger::new(LevelFilter::Warn)
            .without_stderr()
            .with_file_output(&path);

        logger.log(
            &Record::builder()
                .args(format_args!("action omitted"))
                .level(Level::Warn)
                .target("scribe::menu")
                .build(),
        );
        logger.log(
            &Record::builder()
                .args(format_args!("filtered"))
                .level(Level::Debug)
                .target("scribe::menu")
                .build(),
        );

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("WARNING: action omitted in scribe::menu"));
        assert!(!written.contains("filtered"));
    }
}
