//! 压缩数据包.
//!
//! 编码器产出的一帧压缩数据, 带解码时间戳并指回产出它的流.

use std::sync::{Arc, Weak};

use aenc_core::{AudioStreamInfo, Rational};
use bytes::Bytes;

/// 压缩数据包
///
/// 数据归调用方所有. 对流信息只持有弱引用, 编码器关闭后 `info()` 返回 `None`.
#[derive(Debug, Clone)]
pub struct CompressedPacket {
    /// 压缩数据
    pub data: Bytes,
    /// 解码时间戳 (以 time_base 为单位)
    pub dts: i64,
    /// 时长 (以 time_base 为单位)
    pub duration: i64,
    /// 时间基
    pub time_base: Rational,
    /// 所属流
    info: Weak<AudioStreamInfo>,
}

impl CompressedPacket {
    /// 创建数据包
    pub fn new(data: impl Into<Bytes>, dts: i64, info: &Arc<AudioStreamInfo>) -> Self {
        Self {
            data: data.into(),
            dts,
            duration: i64::from(info.frame_len),
            time_base: info.time_base,
            info: Arc::downgrade(info),
        }
    }

    /// 数据大小 (字节)
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 是否为空包
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 所属流的信息
    pub fn info(&self) -> Option<Arc<AudioStreamInfo>> {
        self.info.upgrade()
    }

    /// 解码时间 (秒)
    pub fn dts_seconds(&self) -> f64 {
        self.time_base.ticks_to_seconds(self.dts)
    }
}
