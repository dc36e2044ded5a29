//! 编码后端能力接口.
//!
//! 适配层不直接实现 AAC 编码, 而是驱动一个外部编码后端. 后端负责:
//! - 接受输入 (交错浮点 PCM) 与输出 (AAC) 流格式
//! - 公布合法的码率值表
//! - 按量化后的 [`CodecConfig`] 配置编码参数
//! - 提供 magic cookie (esds 描述符) 与最大输出包大小
//! - 在 `fill_buffer` 中通过 [`PcmInput`] 回调拉取 PCM, 产出压缩数据
//!
//! 拉取式回调在 Rust 中表达为一个 trait 对象参数, 后端在一次 `fill_buffer`
//! 内可以多次调用 `pull`.

use std::fmt;

use aenc_core::{AencResult, SampleFormat};

use crate::codec_config::CodecConfig;

/// 后端流格式标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormatId {
    /// 线性 PCM
    LinearPcm,
    /// AAC-LC
    AacLc,
    /// HE-AAC
    AacHe,
}

impl fmt::Display for AudioFormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LinearPcm => "lpcm",
            Self::AacLc => "aac",
            Self::AacHe => "aach",
        };
        write!(f, "{name}")
    }
}

/// 后端流格式描述
///
/// 压缩格式中为 0 的字段表示由后端决定, 协商后通过
/// [`EncoderBackend::output_format`] 读回实际值.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFormat {
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 格式标识
    pub format_id: AudioFormatId,
    /// 采样格式 (压缩格式为 `None`)
    pub sample_format: SampleFormat,
    /// 声道数
    pub channels: u32,
    /// 每声道位数 (压缩格式为 0)
    pub bits_per_channel: u32,
    /// 每个数据包包含的采样帧数
    pub frames_per_packet: u32,
    /// 每个采样帧的字节数 (压缩格式为 0)
    pub bytes_per_frame: u32,
}

impl StreamFormat {
    /// 交错 32 位浮点 PCM 输入格式
    pub fn pcm_f32(sample_rate: u32, channels: u32) -> Self {
        Self {
            sample_rate,
            format_id: AudioFormatId::LinearPcm,
            sample_format: SampleFormat::F32,
            channels,
            bits_per_channel: 32,
            frames_per_packet: 1,
            bytes_per_frame: 4 * channels,
        }
    }

    /// 压缩输出格式, 帧长等由后端填写
    pub fn compressed(format_id: AudioFormatId, sample_rate: u32, channels: u32) -> Self {
        Self {
            sample_rate,
            format_id,
            sample_format: SampleFormat::None,
            channels,
            bits_per_channel: 0,
            frames_per_packet: 0,
            bytes_per_frame: 0,
        }
    }
}

/// 码率值表的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitrateValueSet {
    /// 可接受的范围 (用于钳位)
    Limited,
    /// 可直接使用的离散值 (用于取最近值)
    Available,
}

/// 一次拉取得到的交错 PCM
#[derive(Debug, Clone, Copy)]
pub struct InputBuffer<'a> {
    /// 交错采样, 长度为 `frames * channels`
    pub data: &'a [f32],
    /// 采样帧数, 0 表示当前没有更多输入
    pub frames: u32,
    /// 声道数
    pub channels: u32,
}

impl InputBuffer<'static> {
    /// 空缓冲
    pub fn empty(channels: u32) -> Self {
        Self {
            data: &[],
            frames: 0,
            channels,
        }
    }
}

impl InputBuffer<'_> {
    /// 是否不含采样
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }
}

/// PCM 输入回调
///
/// 后端在 `fill_buffer` 期间调用. 返回的切片只在下一次 `pull` 之前有效.
pub trait PcmInput {
    /// 请求至多 `frames` 个采样帧 (0 表示由提供方决定)
    fn pull(&mut self, frames: u32) -> InputBuffer<'_>;
}

/// 一次 `fill_buffer` 的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillOutcome {
    /// 写入输出缓冲区的字节数
    pub bytes: usize,
    /// 产出的数据包数
    pub packets: u32,
}

/// 编码后端 trait
///
/// 所有方法在出错时返回 [`aenc_core::AencError::Backend`] 或
/// [`aenc_core::AencError::Negotiation`].
pub trait EncoderBackend: Send {
    /// 后端名称
    fn name(&self) -> &str;

    /// 打开后端组件
    fn open(&mut self) -> AencResult<()>;

    /// 设置输入流格式
    fn set_input_format(&mut self, format: &StreamFormat) -> AencResult<()>;

    /// 设置输出流格式
    fn set_output_format(&mut self, format: &StreamFormat) -> AencResult<()>;

    /// 读回实际生效的输入格式
    fn input_format(&self) -> AencResult<StreamFormat>;

    /// 读回实际生效的输出格式
    fn output_format(&self) -> AencResult<StreamFormat>;

    /// 查询合法码率值 (kbps, 升序)
    fn bitrate_values(&self, set: BitrateValueSet) -> AencResult<Vec<i32>>;

    /// 应用量化后的编码配置
    fn apply_config(&mut self, config: &CodecConfig) -> AencResult<()>;

    /// 单个输出包的最大字节数
    fn max_output_packet_size(&self) -> AencResult<usize>;

    /// 获取 magic cookie (esds 描述符序列)
    fn magic_cookie(&self) -> AencResult<Vec<u8>>;

    /// 拉取 PCM 并编码, 最多写满 `out`
    fn fill_buffer(&mut self, input: &mut dyn PcmInput, out: &mut [u8]) -> AencResult<FillOutcome>;

    /// 关闭后端, 可重复调用
    fn close(&mut self);
}
