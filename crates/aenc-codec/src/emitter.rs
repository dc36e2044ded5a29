//! 数据包发射器.
//!
//! 驱动后端完成一次 `fill_buffer`, 把结果复制成独立的 [`CompressedPacket`]
//! 并打上解码时间戳.

use std::sync::Arc;

use aenc_core::AudioStreamInfo;
use bytes::Bytes;
use log::{trace, warn};

use crate::backend::EncoderBackend;
use crate::packet::CompressedPacket;
use crate::pump::FramePump;

/// 数据包发射器
pub struct PacketEmitter {
    /// 后端输出缓冲区, 大小为最大输出包字节数
    buffer: Vec<u8>,
    /// 输出流信息
    info: Arc<AudioStreamInfo>,
}

impl PacketEmitter {
    /// 创建发射器
    pub fn new(max_packet_size: usize, info: Arc<AudioStreamInfo>) -> Self {
        Self {
            buffer: vec![0; max_packet_size],
            info,
        }
    }

    /// 输出缓冲区大小
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// 执行一次编码调用
    ///
    /// 后端出错、没有写出字节、报告的字节数超出缓冲区或没有产出数据包时返回 `None`.
    pub fn fill(
        &mut self,
        backend: &mut dyn EncoderBackend,
        pump: &mut FramePump,
    ) -> Option<CompressedPacket> {
        let outcome = match backend.fill_buffer(pump, &mut self.buffer) {
            Ok(o) => o,
            Err(e) => {
                warn!("{}: 编码调用失败: {e}", backend.name());
                return None;
            }
        };
        if outcome.bytes == 0 || outcome.packets == 0 {
            return None;
        }
        if outcome.bytes > self.buffer.len() {
            warn!(
                "{}: 编码调用报告 {} 字节, 超出输出缓冲区 {} 字节, 丢弃该包",
                backend.name(),
                outcome.bytes,
                self.buffer.len()
            );
            return None;
        }
        let size = outcome.bytes;
        let data = Bytes::copy_from_slice(&self.buffer[..size]);
        let dts = pump.next_dts(self.info.frame_len);
        trace!("{}: 数据包 dts={dts}, {size} 字节", backend.name());
        Some(CompressedPacket::new(data, dts, &self.info))
    }
}
