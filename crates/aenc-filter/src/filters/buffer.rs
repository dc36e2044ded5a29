//! 内存采样源.
//!
//! 由调用方直接提供平面浮点数据, 不经注册表创建.

use aenc_core::{AencError, AencResult, AudioStreamInfo};

use crate::{AudioFilter, SampleWindow};

/// 内存采样源
pub struct BufferSource {
    /// 流信息
    info: AudioStreamInfo,
    /// 平面采样数据
    planes: Vec<Vec<f32>>,
}

impl BufferSource {
    /// 以平面数据创建
    ///
    /// 各声道长度必须一致.
    pub fn new(sample_rate: u32, planes: Vec<Vec<f32>>) -> AencResult<Self> {
        if planes.is_empty() {
            return Err(AencError::InvalidArgument("内存源至少需要一个声道".into()));
        }
        let len = planes[0].len();
        if planes.iter().any(|p| p.len() != len) {
            return Err(AencError::InvalidArgument("内存源各声道长度不一致".into()));
        }
        if sample_rate == 0 {
            return Err(AencError::InvalidArgument("采样率不能为 0".into()));
        }
        Ok(Self {
            info: AudioStreamInfo::raw_f32(sample_rate, planes.len() as u32),
            planes,
        })
    }

    /// 每声道总采样数
    pub fn len(&self) -> usize {
        self.planes[0].len()
    }

    /// 是否不含任何采样
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AudioFilter for BufferSource {
    fn name(&self) -> &str {
        "buffer"
    }

    fn info(&self) -> &AudioStreamInfo {
        &self.info
    }

    fn fetch_samples(&mut self, start: u64, end: u64) -> AencResult<Option<SampleWindow>> {
        Ok(SampleWindow::from_planes(&self.planes, start, end))
    }
}
