//! 音频流信息.
//!
//! 滤镜链用它描述自己产出的原始采样, 编码器用它描述协商后的压缩输出.

use crate::rational::Rational;

/// 音频流信息
///
/// 编码器在协商完成后创建, 后端打开后不再修改.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioStreamInfo {
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道数 (1-8)
    pub channels: u32,
    /// 单声道单个采样点的字节数
    pub chan_size: u32,
    /// 一个采样帧 (所有声道) 的字节数
    pub sample_size: u32,
    /// 每个压缩帧包含的采样数 (0 表示未知/可变)
    pub frame_len: u32,
    /// 每个压缩帧对应的原始字节数
    pub frame_size: u32,
    /// 时间基
    pub time_base: Rational,
    /// 编解码器初始化数据 (如 AudioSpecificConfig)
    pub extra_data: Vec<u8>,
}

impl AudioStreamInfo {
    /// 以 32 位浮点采样描述一路原始音频
    pub fn raw_f32(sample_rate: u32, channels: u32) -> Self {
        Self {
            sample_rate,
            channels,
            chan_size: 4,
            sample_size: channels * 4,
            frame_len: 0,
            frame_size: 0,
            time_base: Rational::from_sample_rate(sample_rate),
            extra_data: Vec::new(),
        }
    }

    /// 设置每帧采样数并同步更新帧字节数
    pub fn set_frame_len(&mut self, frame_len: u32) {
        self.frame_len = frame_len;
        self.frame_size = frame_len * self.sample_size;
    }

    /// 初始化数据长度 (字节)
    pub fn extra_data_size(&self) -> usize {
        self.extra_data.len()
    }
}
