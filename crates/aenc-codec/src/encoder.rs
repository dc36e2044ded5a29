//! 音频编码器 trait 定义.
//!
//! 所有编码器适配器都实现 `AudioEncoder` trait.

use aenc_core::AudioStreamInfo;

use crate::packet::CompressedPacket;

/// 音频编码器 trait
///
/// 编码器在创建时接管滤镜链尾并完成后端协商, 之后按拉取方式工作:
/// 1. 反复调用 `next_packet()` 取出压缩数据包, 直到返回 `None`
/// 2. 调用 `finish()` 取出后端缓存的剩余数据
/// 3. 调用 `close()` (或直接丢弃) 释放后端
pub trait AudioEncoder: Send {
    /// 编码器名称
    fn codec_name(&self) -> &str;

    /// 协商后的输出流信息
    fn stream_info(&self) -> &AudioStreamInfo;

    /// 取出下一个压缩数据包
    ///
    /// 输入耗尽或进入收尾阶段后返回 `None`.
    fn next_packet(&mut self) -> Option<CompressedPacket>;

    /// 跳过 `count` 个输入采样 (只前移读取位置)
    fn skip_samples(&mut self, count: u64);

    /// 进入收尾阶段, 取出后端缓存中剩余的一个数据包
    fn finish(&mut self) -> Option<CompressedPacket>;

    /// 释放数据包
    fn free_packet(&mut self, packet: CompressedPacket) {
        drop(packet);
    }

    /// 关闭编码器并释放后端
    fn close(self: Box<Self>) {}
}
