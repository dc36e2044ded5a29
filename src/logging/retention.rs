use super::LoggingConfig;
use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// 一次清理的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// 超过保留期被删除的文件数
    pub removed: usize,
    /// 被压缩的历史日志数
    pub compressed: usize,
}

/// 历史日志保留策略
///
/// 只处理 `{prefix}.{YYYY-MM-DD}.log[.gz]` 形式的文件: 早于 `retention_days` 的删除,
/// 开启 `compress_history` 时把今天之前的 `.log` 压缩为 `.log.gz`.
pub fn cleanup_logs(config: &LoggingConfig) -> Result<CleanupReport> {
    cleanup_logs_at(config, Local::now().date_naive())
}

pub(super) fn cleanup_logs_at(config: &LoggingConfig, today: NaiveDate) -> Result<CleanupReport> {
    let mut report = CleanupReport::default();
    let dir = Path::new(&config.directory);
    if !dir.is_dir() {
        return Ok(report);
    }

    let oldest_kept = today - ChronoDuration::days(config.retention_days);
    let entries =
        fs::read_dir(dir).with_context(|| format!("读取日志目录失败, path={}", dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some((date, compressed)) = parse_rotated_log_name(name, &config.file_prefix) else {
            continue;
        };

        if date < oldest_kept {
            match fs::remove_file(&path) {
                Ok(()) => report.removed += 1,
                Err(err) => tracing::warn!("删除过期日志失败, path={}: {err}", path.display()),
            }
        } else if config.compress_history && !compressed && date < today {
            match compress_to_gz(&path) {
                Ok(true) => report.compressed += 1,
                Ok(false) => {}
                Err(err) => tracing::warn!("压缩历史日志失败: {err:#}"),
            }
        }
    }

    Ok(report)
}

/// 压缩为 `.gz` 并删除原文件; 目标已存在时不做任何事并返回 `false`
fn compress_to_gz(path: &Path) -> Result<bool> {
    let mut target = path.as_os_str().to_owned();
    target.push(".gz");
    let target = PathBuf::from(target);
    if target.exists() {
        return Ok(false);
    }

    let mut source = File::open(path)
        .with_context(|| format!("打开历史日志失败, path={}", path.display()))?;
    let sink = File::create(&target)
        .with_context(|| format!("创建 gz 文件失败, path={}", target.display()))?;
    let mut gz = GzEncoder::new(BufWriter::new(sink), Compression::default());
    io::copy(&mut source, &mut gz)?;
    gz.finish()?.flush()?;

    fs::remove_file(path)
        .with_context(|| format!("删除原日志失败, path={}", path.display()))?;
    Ok(true)
}

/// 解析 `{prefix}.{YYYY-MM-DD}.log[.gz]`, 返回日期和是否已压缩
pub fn parse_rotated_log_name(file_name: &str, prefix: &str) -> Option<(NaiveDate, bool)> {
    let (rest, compressed) = match file_name.strip_suffix(".gz") {
        Some(rest) => (rest, true),
        None => (file_name, false),
    };
    let date = rest
        .strip_suffix(".log")?
        .strip_prefix(prefix)?
        .strip_prefix('.')?;
    // 只接受补零的 10 字符日期
    if date.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|date| (date, compressed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        match NaiveDate::from_ymd_opt(y, m, d) {
            Some(date) => date,
            None => panic!("测试日期初始化失败"),
        }
    }

    #[test]
    fn test_parse_rotated_log_name() {
        let prefix = "aenc";

        let parsed = parse_rotated_log_name("aenc.2026-02-06.log", prefix);
        assert_eq!(parsed, Some((ymd(2026, 2, 6), false)));

        let parsed = parse_rotated_log_name("aenc.2026-02-06.log.gz", prefix);
        assert_eq!(parsed, Some((ymd(2026, 2, 6), true)));

        assert!(parse_rotated_log_name("aenc.log", prefix).is_none());
        assert!(parse_rotated_log_name("other.2026-02-06.log", prefix).is_none());
        assert!(parse_rotated_log_name("aenc.2026-2-6.log", prefix).is_none());
    }

    #[test]
    fn test_cleanup_removes_expired_and_compresses_history() {
        let temp_dir = match TempDir::new() {
            Ok(temp_dir) => temp_dir,
            Err(err) => panic!("创建临时目录失败: {}", err),
        };
        let dir = temp_dir.path();
        let today = ymd(2026, 3, 31);

        let write = |name: &str| {
            let written = fs::write(dir.join(name), b"log line\n");
            assert!(written.is_ok(), "写入 {name} 失败");
        };
        write("aenc.2026-01-01.log");
        write("aenc.2026-01-02.log.gz");
        write("aenc.2026-03-30.log");
        write("aenc.2026-03-31.log");
        write("notes.txt");

        let mut config = LoggingConfig::new("info", dir.to_string_lossy(), "aenc");
        config.retention_days = 30;

        let report = cleanup_logs_at(&config, today);
        let report = match report {
            Ok(report) => report,
            Err(err) => panic!("清理日志失败: {err:#}"),
        };
        assert_eq!(report, CleanupReport { removed: 2, compressed: 1 });

        assert!(!dir.join("aenc.2026-01-01.log").exists());
        assert!(!dir.join("aenc.2026-01-02.log.gz").exists());
        assert!(!dir.join("aenc.2026-03-30.log").exists());
        assert!(dir.join("aenc.2026-03-31.log").exists());
        assert!(dir.join("notes.txt").exists());

        let gz = match File::open(dir.join("aenc.2026-03-30.log.gz")) {
            Ok(file) => file,
            Err(err) => panic!("打开压缩日志失败: {}", err),
        };
        let mut content = String::new();
        assert!(GzDecoder::new(gz).read_to_string(&mut content).is_ok());
        assert_eq!(content, "log line\n");
    }

    #[test]
    fn test_cleanup_without_compression() {
        let temp_dir = match TempDir::new() {
            Ok(temp_dir) => temp_dir,
            Err(err) => panic!("创建临时目录失败: {}", err),
        };
        let dir = temp_dir.path();
        assert!(fs::write(dir.join("aenc.2026-03-30.log"), b"x").is_ok());

        let mut config = LoggingConfig::new("info", dir.to_string_lossy(), "aenc");
        config.compress_history = false;
        let report = cleanup_logs_at(&config, ymd(2026, 3, 31));
        assert_eq!(report.ok(), Some(CleanupReport::default()));
        assert!(dir.join("aenc.2026-03-30.log").exists());
    }

    #[test]
    fn test_cleanup_missing_directory_is_noop() {
        let config = LoggingConfig::new("info", "/nonexistent/aenc-logs", "aenc");
        assert_eq!(cleanup_logs(&config).ok(), Some(CleanupReport::default()));
    }
}
