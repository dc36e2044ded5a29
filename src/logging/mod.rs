//! 日志初始化.
//!
//! 库 crate 统一通过 `log` 门面输出, 这里安装 tracing 订阅器接收这些记录:
//! - console: stderr, 彩色, 带源码位置, 级别取 `LoggingConfig::level`
//! - file: 无色, 写入 `{directory}/{prefix}.{YYYY-MM-DD}.log`, 跨天自动换文件,
//!   可通过 `AENC_LOG` 环境变量覆盖过滤规则
//!
//! 初始化时执行一次历史日志保留策略 (见 [`cleanup_logs`]).

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, FmtContext, FormatEvent, FormatFields, format::Writer},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

mod retention;

pub use retention::{CleanupReport, cleanup_logs, parse_rotated_log_name};

/// 文件日志过滤规则的环境变量
pub const LOG_ENV: &str = "AENC_LOG";

/// 日志配置, 可直接从 JSON 反序列化
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 过滤规则 (`info`, `aenc_codec=debug` 等 EnvFilter 语法)
    pub level: String,
    pub directory: String,
    pub file_prefix: String,
    /// 历史日志保留天数
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    /// 是否把过去的日志压缩为 `.gz`
    #[serde(default = "default_compress_history")]
    pub compress_history: bool,
}

fn default_retention_days() -> i64 {
    30
}

fn default_compress_history() -> bool {
    true
}

impl LoggingConfig {
    /// 使用默认保留策略创建
    pub fn new(level: &str, directory: impl Into<String>, file_prefix: &str) -> Self {
        Self {
            level: level.to_string(),
            directory: directory.into(),
            file_prefix: file_prefix.to_string(),
            retention_days: default_retention_days(),
            compress_history: default_compress_history(),
        }
    }
}

/// 由 `-v` 次数得到日志级别: 0=info, 1=debug, 2+=trace
pub fn verbosity_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 安装全局日志订阅器
///
/// 全局订阅器只能安装一次, 重复调用返回错误.
pub fn init(config: LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory)
        .with_context(|| format!("创建日志目录失败, path={}", config.directory))?;

    let writer = DailyFileWriter::new(Path::new(&config.directory), &config.file_prefix)?;
    let (writer, guard) = tracing_appender::non_blocking(writer);

    let layers = vec![console_layer(&config.level), file_layer(&config.level, writer)];
    Registry::default()
        .with(layers)
        .try_init()
        .context("安装日志订阅器失败")?;
    FILE_GUARD.set(guard).ok();

    match cleanup_logs(&config) {
        Ok(report) if report != CleanupReport::default() => tracing::debug!(
            "历史日志清理: 删除 {} 个, 压缩 {} 个",
            report.removed,
            report.compressed
        ),
        Ok(_) => {}
        Err(err) => tracing::error!("启动时清理日志失败: {err:#}"),
    }

    Ok(())
}

fn console_layer(level: &str) -> BoxedLayer {
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .event_format(LineFormat::Console)
        .with_filter(EnvFilter::new(level))
        .boxed()
}

fn file_layer(level: &str, writer: NonBlocking) -> BoxedLayer {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .event_format(LineFormat::File)
        .with_filter(filter)
        .boxed()
}

/// 按天切换的日志文件
///
/// 每次写入前比较日期, 跨天时打开新一天的文件.
struct DailyFileWriter {
    directory: PathBuf,
    prefix: String,
    date: NaiveDate,
    file: File,
}

impl DailyFileWriter {
    fn new(directory: &Path, prefix: &str) -> Result<Self> {
        let date = Local::now().date_naive();
        Ok(Self {
            file: open_log_file(&build_current_log_path(directory, prefix, date))?,
            directory: directory.to_path_buf(),
            prefix: prefix.to_string(),
            date,
        })
    }

    fn current(&mut self) -> std::io::Result<&mut File> {
        let today = Local::now().date_naive();
        if today != self.date {
            let path = build_current_log_path(&self.directory, &self.prefix, today);
            self.file = open_log_file(&path).map_err(std::io::Error::other)?;
            self.date = today;
        }
        Ok(&mut self.file)
    }
}

impl Write for DailyFileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.current()?.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("打开日志文件失败, path={}", path.display()))
}

pub(crate) fn build_current_log_path(directory: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    directory.join(format!("{}.{}.log", prefix, date.format("%Y-%m-%d")))
}

/// 单行日志格式
///
/// `[MM-DD HH:MM:SS.mmm] LEVEL file:line > message`, 文件输出不带颜色和源码位置.
#[derive(Debug, Clone, Copy)]
enum LineFormat {
    Console,
    File,
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::ERROR => "\x1b[31m",
        Level::WARN => "\x1b[33m",
        Level::INFO => "\x1b[32m",
        _ => "\x1b[34m",
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let level = meta.level().as_str();
        write!(writer, "[{}] ", Local::now().format("%m-%d %H:%M:%S%.3f"))?;
        match self {
            Self::Console => write!(
                writer,
                "{}{level:5}\x1b[0m {}:{} > ",
                level_color(*meta.level()),
                meta.file().unwrap_or("unknown"),
                meta.line().unwrap_or(0)
            )?,
            Self::File => write!(writer, "{level:5} > ")?,
        }
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_current_log_path() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 6);
        match date {
            Some(date) => {
                let path = build_current_log_path(Path::new("logs"), "aenc", date);
                assert_eq!(path, PathBuf::from("logs/aenc.2026-02-06.log"));
            }
            None => panic!("测试日期初始化失败"),
        }
    }

    #[test]
    fn test_verbosity_level() {
        assert_eq!(verbosity_level(0), "info");
        assert_eq!(verbosity_level(1), "debug");
        assert_eq!(verbosity_level(5), "trace");
    }

    #[test]
    fn test_level_color() {
        assert_eq!(level_color(Level::ERROR), "\x1b[31m");
        assert_eq!(level_color(Level::TRACE), level_color(Level::DEBUG));
    }

    #[test]
    fn test_daily_writer_appends_to_today_file() {
        let temp_dir = match tempfile::TempDir::new() {
            Ok(temp_dir) => temp_dir,
            Err(err) => panic!("创建临时目录失败: {}", err),
        };
        let mut writer = match DailyFileWriter::new(temp_dir.path(), "aenc") {
            Ok(writer) => writer,
            Err(err) => panic!("创建日志文件失败: {}", err),
        };
        assert!(writer.write_all(b"hello\n").is_ok());
        assert!(writer.write_all(b"world\n").is_ok());
        assert!(writer.flush().is_ok());

        let path = build_current_log_path(temp_dir.path(), "aenc", writer.date);
        let content = std::fs::read_to_string(path);
        assert_eq!(content.ok().as_deref(), Some("hello\nworld\n"));
    }
}
