//! # aenc-filter
//!
//! aenc 原始音频滤镜链库.
//!
//! 滤镜链是拉取式的: 下游 (编码器) 按采样位置区间向链尾请求数据,
//! 每个滤镜再向它的上一级滤镜请求, 直到源滤镜. 采样在链内统一为平面 32 位浮点.
//!
//! ## 内置滤镜
//!
//! - **源**: tone (正弦波), wav (RIFF/WAVE 文件), BufferSource (调用方提供的内存数据, 不注册)
//! - **处理**: volume (音量)
//!
//! ## 使用示例
//!
//! ```rust
//! use aenc_filter::{AudioFilterId, FilterRegistry};
//!
//! let mut reg = FilterRegistry::new();
//! aenc_filter::register_all(&mut reg);
//!
//! let tone = reg.create(AudioFilterId::Tone, None, "frequency=1000:duration=0.5").unwrap();
//! let mut chain = reg.create(AudioFilterId::Volume, Some(tone), "db=-6").unwrap();
//! let window = chain.fetch_samples(0, 1024).unwrap().unwrap();
//! assert_eq!(window.sample_count, 1024);
//! ```

pub mod filters;
pub mod registry;
pub mod window;

use aenc_core::{AencResult, AudioStreamInfo};

pub use filters::buffer::BufferSource;
pub use filters::tone::ToneSource;
pub use filters::volume::VolumeFilter;
pub use filters::wav::WavSource;
pub use registry::{AudioFilterId, FilterRegistry};
pub use window::{SampleWindow, WindowFlags};

/// 音频滤镜 trait
///
/// 链中每一级 (包括源) 都实现此 trait. 编码器只持有链尾.
pub trait AudioFilter: Send {
    /// 获取滤镜名称
    fn name(&self) -> &str;

    /// 本级输出的流信息
    fn info(&self) -> &AudioStreamInfo;

    /// 取出 `[start, end)` 区间的采样 (以流起点为 0 的采样序号)
    ///
    /// # 返回
    /// - `Ok(Some(window))`: 取到的数据, 可能少于请求量 (流末尾)
    /// - `Ok(None)`: 区间起点已在流末尾之后
    fn fetch_samples(&mut self, start: u64, end: u64) -> AencResult<Option<SampleWindow>>;
}

/// 注册所有内置滤镜
///
/// 注册顺序必须与 [`AudioFilterId`] 的声明顺序一致, 否则注册时触发断言.
pub fn register_all(registry: &mut FilterRegistry) {
    registry.register(AudioFilterId::Tone, "tone", ToneSource::create);
    registry.register(AudioFilterId::Wav, "wav", WavSource::create);
    registry.register(AudioFilterId::Volume, "volume", VolumeFilter::create);
}
