//! 编码器配置.
//!
//! `CodecConfig` 描述协商完成后交给后端的量化配置: 目标码率控制模式、质量档位,
//! 以及码率/VBR 质量、采样率、声道配置在后端合法值表中的位置.
//! 只在初始化阶段写入, 之后只读.

use std::fmt;

use crate::backend::AudioFormatId;

/// VBR 质量阶梯 (后端只接受这些值)
pub const VBR_QUALITY_VALUES: [i32; 15] = [
    0, 9, 18, 27, 36, 45, 54, 63, 73, 82, 91, 100, 109, 118, 127,
];

/// VBR 质量的默认值
pub const DEFAULT_VBR_QUALITY: i32 = 63;

/// AAC 编码档次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AacProfile {
    /// AAC-LC (基础档次)
    Lc,
    /// HE-AAC (高效档次)
    He,
}

impl AacProfile {
    /// 编解码器名称
    pub const fn codec_name(self) -> &'static str {
        match self {
            Self::Lc => "aac",
            Self::He => "aac_he",
        }
    }

    /// 后端输出格式
    pub const fn format_id(self) -> AudioFormatId {
        match self {
            Self::Lc => AudioFormatId::AacLc,
            Self::He => AudioFormatId::AacHe,
        }
    }

    /// 是否支持 VBR
    pub const fn supports_vbr(self) -> bool {
        matches!(self, Self::Lc)
    }

    /// CBR/ABR 模式下的默认码率 (kbps)
    pub const fn default_bitrate(self) -> i32 {
        match self {
            Self::Lc => 128,
            Self::He => 64,
        }
    }

    /// 采样率在后端采样率表中的索引
    pub const fn samplerate_index(self, sample_rate: u32) -> Option<u32> {
        match self {
            Self::Lc => match sample_rate {
                8000 => Some(1),
                11025 => Some(2),
                12000 => Some(3),
                16000 => Some(4),
                22050 => Some(5),
                24000 => Some(6),
                32000 => Some(7),
                44100 => Some(8),
                48000 => Some(9),
                _ => None,
            },
            Self::He => match sample_rate {
                32000 => Some(1),
                44100 => Some(2),
                48000 => Some(3),
                88200 => Some(4),
                96000 => Some(5),
                _ => None,
            },
        }
    }

    /// 声道数在后端声道配置表中的索引
    pub const fn channel_config_index(self, channels: u32) -> Option<u32> {
        match self {
            Self::Lc => match channels {
                1 => Some(0),
                2 => Some(1),
                4 => Some(2),
                5 => Some(4),
                6 => Some(5),
                7 => Some(7),
                8 => Some(9),
                _ => None,
            },
            Self::He => match channels {
                1 => Some(0),
                2 => Some(1),
                4 => Some(2),
                6 => Some(3),
                8 => Some(4),
                _ => None,
            },
        }
    }
}

impl fmt::Display for AacProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lc => "AAC-LC",
            Self::He => "AAC-HE",
        };
        write!(f, "{name}")
    }
}

/// 码率控制模式
///
/// 两个档次的模式编号互不相同, `value()` 给出后端使用的编号.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitrateControlMode {
    /// LC 平均码率
    LcAbr,
    /// LC 真 VBR
    LcTrueVbr,
    /// LC 受限 VBR
    LcConstrainedVbr,
    /// LC 恒定码率
    LcCbr,
    /// HE 恒定码率
    HeCbr,
    /// HE 平均码率
    HeAbr,
    /// HE 受限 VBR
    HeConstrainedVbr,
}

impl BitrateControlMode {
    /// 按档次与 VBR 开关选择模式
    pub const fn select(profile: AacProfile, is_vbr: bool) -> Self {
        match (profile, is_vbr) {
            (AacProfile::Lc, true) => Self::LcTrueVbr,
            (AacProfile::Lc, false) => Self::LcAbr,
            (AacProfile::He, _) => Self::HeAbr,
        }
    }

    /// 后端模式编号
    pub const fn value(self) -> u32 {
        match self {
            Self::LcAbr => 0,
            Self::LcTrueVbr => 1,
            Self::LcConstrainedVbr => 2,
            Self::LcCbr => 3,
            Self::HeCbr => 0,
            Self::HeAbr => 1,
            Self::HeConstrainedVbr => 2,
        }
    }
}

/// 编码质量档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncoderQuality {
    /// 中
    #[default]
    Medium = 0,
    /// 高
    High = 1,
    /// 最高
    Highest = 2,
}

impl EncoderQuality {
    /// 由序号 (0-2) 构造
    pub const fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Medium),
            1 => Some(Self::High),
            2 => Some(Self::Highest),
            _ => None,
        }
    }

    /// 档位名称
    pub const fn name(self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::High => "high",
            Self::Highest => "highest",
        }
    }
}

/// 量化后的码率控制目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateTarget {
    /// CBR/ABR: 码率在后端 "available" 码率表中的位置及其值 (kbps)
    Bitrate {
        /// 表中下标
        index: usize,
        /// 码率 (kbps)
        kbps: i32,
    },
    /// VBR: 质量值在质量阶梯中的位置及其值
    VbrQuality {
        /// 阶梯下标
        index: usize,
        /// 质量值 (0-127)
        value: i32,
    },
}

impl RateTarget {
    /// 量化后的目标值 (kbps 或质量值)
    pub const fn value(self) -> i32 {
        match self {
            Self::Bitrate { kbps, .. } => kbps,
            Self::VbrQuality { value, .. } => value,
        }
    }
}

/// 交给后端的编码配置
///
/// 所有索引字段都已对照后端公布的合法值解析完毕; 无法解析的情况在
/// 协商阶段即作为错误返回, 不会出现在这里.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// 编码档次
    pub profile: AacProfile,
    /// 是否为 VBR
    pub is_vbr: bool,
    /// 码率控制模式 (目标格式标识)
    pub mode: BitrateControlMode,
    /// 质量档位
    pub quality: EncoderQuality,
    /// 码率或 VBR 质量
    pub rate: RateTarget,
    /// 采样率索引
    pub samplerate_index: u32,
    /// 声道配置索引
    pub channel_config_index: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_采样率索引表() {
        assert_eq!(AacProfile::Lc.samplerate_index(44100), Some(8));
        assert_eq!(AacProfile::Lc.samplerate_index(96000), None);
        assert_eq!(AacProfile::He.samplerate_index(96000), Some(5));
        assert_eq!(AacProfile::He.samplerate_index(22050), None);
    }

    #[test]
    fn test_声道配置索引表() {
        assert_eq!(AacProfile::Lc.channel_config_index(5), Some(4));
        assert_eq!(AacProfile::Lc.channel_config_index(3), None);
        assert_eq!(AacProfile::He.channel_config_index(6), Some(3));
        assert_eq!(AacProfile::He.channel_config_index(5), None);
        assert_eq!(AacProfile::Lc.channel_config_index(9), None);
    }

    #[test]
    fn test_模式选择() {
        assert_eq!(
            BitrateControlMode::select(AacProfile::Lc, true).value(),
            1
        );
        assert_eq!(
            BitrateControlMode::select(AacProfile::Lc, false),
            BitrateControlMode::LcAbr
        );
        assert_eq!(
            BitrateControlMode::select(AacProfile::He, true),
            BitrateControlMode::HeAbr
        );
    }

    #[test]
    fn test_质量档位() {
        assert_eq!(EncoderQuality::from_index(2), Some(EncoderQuality::Highest));
        assert_eq!(EncoderQuality::from_index(3), None);
        assert_eq!(EncoderQuality::default().name(), "medium");
    }

    #[test]
    fn test_质量阶梯升序() {
        assert!(VBR_QUALITY_VALUES.windows(2).all(|w| w[0] < w[1]));
        assert!(VBR_QUALITY_VALUES.contains(&DEFAULT_VBR_QUALITY));
    }
}
