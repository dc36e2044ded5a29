//! aenc - 编码试运行命令行工具
//!
//! 从 WAV 文件或正弦波构建滤镜链, 用回环后端打开编码器,
//! 输出协商后的流信息和数据包统计.

mod chain;

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::process;

use aenc::logging::{self, LoggingConfig};
use aenc_codec::{AudioEncoder, CompressedPacket, LoopbackBackend};
use aenc_codec::EncoderRegistry;
use aenc_filter::{AudioFilter, FilterRegistry};

#[derive(Parser, Debug)]
#[command(name = "aenc", version, about = "纯 Rust 音频编码适配层试运行工具")]
struct Cli {
    /// 输入 WAV 文件路径
    #[arg(short, long)]
    input: Option<String>,

    /// 正弦波源选项 (如 "frequency=1000:samplerate=44100:duration=2")
    #[arg(long, conflicts_with = "input")]
    tone: Option<String>,

    /// 编码器名称 (aac, aac_he)
    #[arg(short, long, default_value = "aac")]
    encoder: String,

    /// 编码器选项串 (如 "is_vbr=0:bitrate=96:quality=1")
    #[arg(short, long, default_value = "")]
    options: String,

    /// 编码前的音量调整 (dB)
    #[arg(long = "volume-db", allow_hyphen_values = true)]
    volume_db: Option<f64>,

    /// 回环后端的 "available" 码率表 (kbps, 逗号分隔)
    #[arg(long, value_delimiter = ',')]
    bitrates: Vec<i32>,

    /// 逐包打印
    #[arg(long)]
    dump: bool,

    /// 列出内置滤镜和编码器
    #[arg(long)]
    list: bool,

    /// 日志目录
    #[arg(long = "log-dir", default_value = "logs")]
    log_dir: String,

    /// 日志配置文件 (JSON, 覆盖 --log-dir 和 -v)
    #[arg(long = "log-config")]
    log_config: Option<String>,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// 数据包统计
#[derive(Debug, Default)]
struct PacketStats {
    packets: u64,
    bytes: u64,
    max_size: usize,
    last_end: i64,
}

impl PacketStats {
    fn record(&mut self, packet: &CompressedPacket) {
        self.packets += 1;
        self.bytes += packet.size() as u64;
        self.max_size = self.max_size.max(packet.size());
        self.last_end = packet.dts + packet.duration;
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(load_logging_config(&cli)) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }

    if let Err(e) = run(&cli) {
        log::error!("{e:#}");
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}

fn load_logging_config(cli: &Cli) -> LoggingConfig {
    let default =
        LoggingConfig::new(logging::verbosity_level(cli.verbose), &*cli.log_dir, "aenc-cli");
    let Some(path) = &cli.log_config else {
        return default;
    };
    let parsed = std::fs::read_to_string(path)
        .with_context(|| format!("读取日志配置失败, path={path}"))
        .and_then(|text| serde_json::from_str(&text).context("解析日志配置失败"));
    match parsed {
        Ok(config) => config,
        Err(e) => {
            eprintln!("警告: {e:#}, 使用默认日志配置");
            default
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let filters = aenc::default_filter_registry();
    let encoders = aenc::default_encoder_registry();

    if cli.list {
        print_registries(&filters, &encoders);
        return Ok(());
    }

    let chain = match (&cli.input, &cli.tone) {
        (Some(path), _) => chain::wav_chain(&filters, path, cli.volume_db)?,
        (None, Some(opts)) => chain::tone_chain(&filters, opts, cli.volume_db)?,
        (None, None) => bail!("必须指定输入文件 (-i) 或正弦波源 (--tone)"),
    };
    let input = chain.info().clone();

    let backend = if cli.bitrates.is_empty() {
        LoopbackBackend::new()
    } else {
        let mut available = cli.bitrates.clone();
        available.sort_unstable();
        available.dedup();
        let limited = match (available.first(), available.last()) {
            (Some(&lo), Some(&hi)) => vec![lo, hi],
            _ => Vec::new(),
        };
        LoopbackBackend::with_bitrates(limited, available)
    };

    let mut enc = encoders
        .create_by_name(&cli.encoder, chain, &cli.options, Box::new(backend))
        .with_context(|| format!("打开编码器 {} 失败", cli.encoder))?;

    eprintln!("aenc 版本 {}", aenc::version());
    eprintln!("输入: {}Hz, {} 声道", input.sample_rate, input.channels);
    let info = enc.stream_info();
    eprintln!(
        "输出: {} {}Hz, {} 声道, 帧长 {} 采样, 时间基 {}",
        enc.codec_name(),
        info.sample_rate,
        info.channels,
        info.frame_len,
        info.time_base
    );
    eprintln!("extra_data: {}", hex(&info.extra_data));

    let stats = drain(enc.as_mut(), cli.dump);
    let seconds = enc.stream_info().time_base.ticks_to_seconds(stats.last_end);
    enc.close();

    eprintln!(
        "数据包: {} 个, 共 {} 字节, 最大 {} 字节, 时长 {:.3}s",
        stats.packets, stats.bytes, stats.max_size, seconds
    );
    Ok(())
}

/// 取完所有数据包, 包括收尾阶段的剩余数据
fn drain(enc: &mut dyn AudioEncoder, dump: bool) -> PacketStats {
    let mut stats = PacketStats::default();
    while let Some(packet) = enc.next_packet() {
        emit(enc, packet, &mut stats, dump);
    }
    if let Some(packet) = enc.finish() {
        emit(enc, packet, &mut stats, dump);
    }
    stats
}

fn emit(enc: &mut dyn AudioEncoder, packet: CompressedPacket, stats: &mut PacketStats, dump: bool) {
    if dump {
        println!(
            "dts={:>8} ({:.3}s) duration={} size={}",
            packet.dts,
            packet.dts_seconds(),
            packet.duration,
            packet.size()
        );
    }
    stats.record(&packet);
    enc.free_packet(packet);
}

fn print_registries(filters: &FilterRegistry, encoders: &EncoderRegistry) {
    println!("滤镜:");
    for (id, name) in filters.list() {
        println!("  [{}] {name}", id.index());
    }
    println!("编码器:");
    for (id, name) in encoders.list() {
        println!("  [{}] {name}", id.index());
    }
}

fn hex(data: &[u8]) -> String {
    if data.is_empty() {
        return "(空)".to_string();
    }
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
