//! # aenc-codec
//!
//! aenc 编码适配层.
//!
//! 把拉取式的滤镜链接到一个以帧为单位工作的外部 AAC 编码后端:
//! - 参数量化: 把码率/VBR 质量对齐到后端公布的离散合法值 ([`quantizer`])
//! - 描述符解析: 从后端 magic cookie (esds) 中取出 AudioSpecificConfig ([`esds`])
//! - 声道重排: 滤镜链顺序 → 后端顺序 ([`channel_map`])
//! - 帧泵: 后端的 PCM 输入回调, 负责取样、EOF 检测和时间戳 ([`pump`])
//! - 数据包发射: 复制后端输出并打时间戳 ([`emitter`])
//!
//! ## 使用示例
//!
//! ```rust
//! use aenc_codec::{AudioEncoder, EncoderId, EncoderRegistry, LoopbackBackend};
//! use aenc_filter::ToneSource;
//!
//! let mut registry = EncoderRegistry::new();
//! aenc_codec::register_all(&mut registry);
//!
//! let chain = Box::new(ToneSource::new(440.0, 48000, 2, 4800, 0.5).unwrap());
//! let mut enc = registry
//!     .create(EncoderId::Aac, chain, "is_vbr=0:bitrate=128", Box::new(LoopbackBackend::new()))
//!     .unwrap();
//! assert_eq!(enc.stream_info().frame_len, 1024);
//!
//! let mut packets = 0;
//! while let Some(pkt) = enc.next_packet() {
//!     packets += 1;
//!     enc.free_packet(pkt);
//! }
//! assert_eq!(packets, 5);
//! enc.close();
//! ```

pub mod backend;
pub mod backends;
pub mod channel_map;
pub mod codec_config;
pub mod emitter;
pub mod encoder;
pub mod encoders;
pub mod esds;
pub mod packet;
pub mod pump;
pub mod quantizer;
pub mod registry;

pub use backend::{
    AudioFormatId, BitrateValueSet, EncoderBackend, FillOutcome, InputBuffer, PcmInput,
    StreamFormat,
};
pub use backends::LoopbackBackend;
pub use codec_config::{AacProfile, BitrateControlMode, CodecConfig, EncoderQuality, RateTarget};
pub use encoder::AudioEncoder;
pub use encoders::aac::{AacEncoder, EncoderOptions};
pub use packet::CompressedPacket;
pub use pump::{FramePump, PumpState};
pub use registry::{EncoderId, EncoderRegistry};

/// 注册所有内置编码器
///
/// 注册顺序必须与 [`EncoderId`] 的声明顺序一致.
pub fn register_all(registry: &mut EncoderRegistry) {
    registry.register(EncoderId::Aac, "aac", AacEncoder::create_lc);
    registry.register(EncoderId::AacHe, "aac_he", AacEncoder::create_he);
}
