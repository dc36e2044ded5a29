//! 音频采样格式定义.
//!
//! 滤镜链内部统一使用平面 32 位浮点 (`F32p`), 送往编码后端前交错为 `F32`.
//! 整数格式仅在读取 WAV 等外部数据时出现.

use std::fmt;

/// 音频采样格式
///
/// - 交错 (Interleaved): 所有声道的采样点交替排列, 如 LRLRLR...
/// - 平面 (Planar): 每个声道独立存储, 如 LLL...RRR...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SampleFormat {
    /// 未指定
    None,
    /// 无符号 8 位整数, 交错
    U8,
    /// 有符号 16 位整数, 交错
    S16,
    /// 有符号 24 位整数 (3 字节打包), 交错
    S24,
    /// 有符号 32 位整数, 交错
    S32,
    /// 32 位浮点, 交错
    F32,
    /// 32 位浮点, 平面
    F32p,
}

impl SampleFormat {
    /// 每个采样点占用的字节数
    pub const fn bytes_per_sample(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S24 => 3,
            Self::S32 | Self::F32 | Self::F32p => 4,
        }
    }

    /// 是否为平面格式
    pub const fn is_planar(&self) -> bool {
        matches!(self, Self::F32p)
    }

    /// 是否为浮点格式
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F32p)
    }

    /// 将一个小端编码的采样点解码为 [-1.0, 1.0) 范围内的浮点值
    ///
    /// `bytes` 长度必须等于 `bytes_per_sample()`, 否则返回 0.0.
    pub fn decode_le(&self, bytes: &[u8]) -> f32 {
        if bytes.len() != self.bytes_per_sample() as usize {
            return 0.0;
        }
        match self {
            Self::U8 => (f32::from(bytes[0]) - 128.0) / 128.0,
            Self::S16 => f32::from(i16::from_le_bytes([bytes[0], bytes[1]])) / 32768.0,
            Self::S24 => {
                // 符号扩展到 32 位
                let v = i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8;
                v as f32 / 8_388_608.0
            }
            Self::S32 => {
                i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32
                    / 2_147_483_648.0
            }
            Self::F32 | Self::F32p => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            Self::None => 0.0,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::S24 => "s24",
            Self::S32 => "s32",
            Self::F32 => "flt",
            Self::F32p => "fltp",
        };
        write!(f, "{name}")
    }
}
