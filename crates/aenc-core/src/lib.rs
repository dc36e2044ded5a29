//! # aenc-core
//!
//! aenc 音频编码适配层核心库, 提供基础类型定义、错误处理和选项解析.
//!
//! 滤镜链 (`aenc-filter`) 与编码器适配层 (`aenc-codec`) 共用这里的类型.

pub mod audio_info;
pub mod error;
pub mod options;
pub mod rational;
pub mod sample_format;

// 重导出常用类型
pub use audio_info::AudioStreamInfo;
pub use error::{AencError, AencResult};
pub use options::SplitOptions;
pub use rational::Rational;
pub use sample_format::SampleFormat;
