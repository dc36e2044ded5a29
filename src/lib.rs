//! # aenc
//!
//! 纯 Rust 实现的音频编码适配层.
//!
//! 把拉取式的原始音频滤镜链接到以帧为单位工作的外部 AAC 编码后端,
//! 负责参数协商 (码率/VBR 质量量化)、AudioSpecificConfig 提取、声道重排和时间戳.
//!
//! # 快速开始
//!
//! ```rust
//! use aenc::codec::{AudioEncoder, EncoderId, LoopbackBackend};
//! use aenc::filter::AudioFilterId;
//!
//! let filters = aenc::default_filter_registry();
//! let encoders = aenc::default_encoder_registry();
//!
//! let chain = filters
//!     .create(AudioFilterId::Tone, None, "samplerate=44100:duration=0.1")
//!     .unwrap();
//! let mut enc = encoders
//!     .create(EncoderId::Aac, chain, "bitrate=96", Box::new(LoopbackBackend::new()))
//!     .unwrap();
//! println!("extra_data: {} 字节", enc.stream_info().extra_data_size());
//! while let Some(pkt) = enc.next_packet() {
//!     enc.free_packet(pkt);
//! }
//! enc.close();
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `aenc-core` | 核心类型、错误、选项串解析 |
//! | `aenc-filter` | 拉取式原始音频滤镜链 |
//! | `aenc-codec` | AAC 编码适配层与后端抽象 |

/// 核心类型与工具
pub use aenc_core as core;

/// 原始音频滤镜链
pub use aenc_filter as filter;

/// 编码适配层
pub use aenc_codec as codec;

pub mod logging;

/// 获取 aenc 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已注册所有内置滤镜的注册表
pub fn default_filter_registry() -> aenc_filter::FilterRegistry {
    let mut registry = aenc_filter::FilterRegistry::new();
    aenc_filter::register_all(&mut registry);
    registry
}

/// 创建已注册所有内置编码器的注册表
pub fn default_encoder_registry() -> aenc_codec::EncoderRegistry {
    let mut registry = aenc_codec::EncoderRegistry::new();
    aenc_codec::register_all(&mut registry);
    registry
}
