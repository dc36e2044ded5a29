//! 回环后端.
//!
//! 不做真正的 AAC 压缩, 但完整实现 [`EncoderBackend`] 的协商与拉取语义:
//! - 公布可配置的码率值表
//! - 按输出格式生成 AudioSpecificConfig 并包装成 esds 描述符序列作为 magic cookie
//! - 每个数据包固定 1024 (LC) / 2048 (HE) 个输出采样帧, 不足一帧的输入先缓存,
//!   输入结束时把剩余部分作为最后一个包输出
//! - 输出采样率低于输入时, 每包按采样率比例消耗更多输入帧
//!
//! 数据包内容是诊断信息:
//!
//! ```text
//! packet_index(4, BE) + frames(2, BE) + channels(1) + peak(1, 0-255)
//! ```

use aenc_core::{AencError, AencResult, SampleFormat};
use log::debug;

use crate::backend::{
    AudioFormatId, BitrateValueSet, EncoderBackend, FillOutcome, PcmInput, StreamFormat,
};
use crate::codec_config::{CodecConfig, RateTarget};
use crate::esds::{
    TAG_DECODER_CONFIG, TAG_DECODER_SPECIFIC_INFO, TAG_ES_DESCRIPTOR, TAG_SL_CONFIG,
    write_descriptor,
};

/// 诊断数据包长度
pub const LOOPBACK_PACKET_SIZE: usize = 8;

/// 每声道最大压缩字节数 (6144 位)
const MAX_BYTES_PER_CHANNEL: usize = 768;

/// AudioSpecificConfig 采样率索引表
const SAMPLE_RATE_TABLE: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

/// 默认 "limited" 码率表 (kbps)
const DEFAULT_LIMITED_BITRATES: [i32; 2] = [16, 320];

/// 默认 "available" 码率表 (kbps)
const DEFAULT_AVAILABLE_BITRATES: [i32; 17] = [
    16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 288, 320,
];

/// 回环后端
pub struct LoopbackBackend {
    /// 是否已打开
    opened: bool,
    /// 输入格式
    input: Option<StreamFormat>,
    /// 输出格式
    output: Option<StreamFormat>,
    /// 已应用的配置
    config: Option<CodecConfig>,
    /// "limited" 码率表
    limited: Vec<i32>,
    /// "available" 码率表
    available: Vec<i32>,
    /// 尚未凑满一帧的交错采样
    pending: Vec<f32>,
    /// 输入是否已结束
    input_done: bool,
    /// 已输出的数据包数
    packets_emitted: u32,
}

impl LoopbackBackend {
    /// 使用默认码率表创建
    pub fn new() -> Self {
        Self::with_bitrates(
            DEFAULT_LIMITED_BITRATES.to_vec(),
            DEFAULT_AVAILABLE_BITRATES.to_vec(),
        )
    }

    /// 使用指定码率表创建
    pub fn with_bitrates(limited: Vec<i32>, available: Vec<i32>) -> Self {
        Self {
            opened: false,
            input: None,
            output: None,
            config: None,
            limited,
            available,
            pending: Vec::new(),
            input_done: false,
            packets_emitted: 0,
        }
    }

    /// 每个数据包的采样帧数
    pub const fn frames_per_packet(format_id: AudioFormatId) -> u32 {
        match format_id {
            AudioFormatId::AacHe => 2048,
            _ => 1024,
        }
    }

    /// 已应用的配置
    pub fn applied_config(&self) -> Option<&CodecConfig> {
        self.config.as_ref()
    }

    fn require_open(&self) -> AencResult<()> {
        if self.opened {
            Ok(())
        } else {
            Err(AencError::Backend("loopback: 后端未打开".into()))
        }
    }

    fn require_output(&self) -> AencResult<&StreamFormat> {
        self.output
            .as_ref()
            .ok_or_else(|| AencError::Backend("loopback: 尚未设置输出格式".into()))
    }

    fn sample_rate_index(sample_rate: u32) -> AencResult<u32> {
        SAMPLE_RATE_TABLE
            .iter()
            .position(|&sr| sr == sample_rate)
            .map(|i| i as u32)
            .ok_or_else(|| {
                AencError::Backend(format!("loopback: 无法为 {sample_rate}Hz 生成 ASC"))
            })
    }

    /// 生成 AudioSpecificConfig
    ///
    /// LC: `aot(5)=2 + sfi(4) + chan(4) + GASpecificConfig(3)=0`.
    /// HE 使用显式分层信令:
    /// `aot(5)=5 + sfi(4, 核心采样率) + chan(4) + ext_sfi(4) + aot(5)=2 + GASpecificConfig(3)=0`.
    fn audio_specific_config(format: &StreamFormat) -> AencResult<Vec<u8>> {
        let chan = match format.channels {
            1..=6 => format.channels,
            8 => 7,
            _ => 0,
        };
        match format.format_id {
            AudioFormatId::AacLc => {
                let sfi = Self::sample_rate_index(format.sample_rate)?;
                let v = (2u16 << 11) | ((sfi as u16) << 7) | ((chan as u16) << 3);
                Ok(v.to_be_bytes().to_vec())
            }
            AudioFormatId::AacHe => {
                let core_sfi = Self::sample_rate_index(format.sample_rate / 2)?;
                let ext_sfi = Self::sample_rate_index(format.sample_rate)?;
                let v = (5u32 << 27) | (core_sfi << 23) | (chan << 19) | (ext_sfi << 15) | (2 << 10);
                Ok(v.to_be_bytes().to_vec())
            }
            AudioFormatId::LinearPcm => Err(AencError::Backend(
                "loopback: 输出格式不是 AAC".into(),
            )),
        }
    }

    /// 生成 esds 描述符序列
    fn build_esds(&self, asc: &[u8]) -> Vec<u8> {
        let avg_bitrate = match self.config.as_ref().map(|c| c.rate) {
            Some(RateTarget::Bitrate { kbps, .. }) => kbps.max(0) as u32 * 1000,
            _ => 0,
        };

        let mut dcd = Vec::with_capacity(13 + 5 + asc.len());
        // objectTypeIndication = MPEG-4 Audio
        dcd.push(0x40);
        // streamType(6)=5 + upStream(1)=0 + reserved(1)=1
        dcd.push(0x15);
        // bufferSizeDB(3)
        dcd.extend_from_slice(&[0x00, 0x00, 0x00]);
        // maxBitrate(4) + avgBitrate(4)
        dcd.extend_from_slice(&avg_bitrate.to_be_bytes());
        dcd.extend_from_slice(&avg_bitrate.to_be_bytes());
        write_descriptor(&mut dcd, TAG_DECODER_SPECIFIC_INFO, asc);

        // ES_ID(2) + flags(1)
        let mut es = vec![0x00, 0x00, 0x00];
        write_descriptor(&mut es, TAG_DECODER_CONFIG, &dcd);
        write_descriptor(&mut es, TAG_SL_CONFIG, &[0x02]);

        let mut esds = Vec::with_capacity(es.len() + 5);
        write_descriptor(&mut esds, TAG_ES_DESCRIPTOR, &es);
        esds
    }

    /// 每个数据包消耗的输入采样帧数
    fn input_frames_per_packet(input: &StreamFormat, output: &StreamFormat) -> usize {
        let out_rate = u64::from(output.sample_rate.max(1));
        let frames = u64::from(output.frames_per_packet) * u64::from(input.sample_rate) / out_rate;
        frames.max(1) as usize
    }

    /// 把 `input_frames` 个输入帧换算为输出帧数 (向上取整)
    fn output_frames(input_frames: usize, input: &StreamFormat, output: &StreamFormat) -> usize {
        let in_rate = u64::from(input.sample_rate.max(1));
        (input_frames as u64 * u64::from(output.sample_rate)).div_ceil(in_rate) as usize
    }

    /// 写出一个诊断数据包
    ///
    /// 消耗 `consumed` 个输入帧, 包头记录 `frames` 个输出帧.
    fn write_packet(
        &mut self,
        consumed: usize,
        frames: usize,
        channels: usize,
        out: &mut [u8],
    ) -> AencResult<usize> {
        if out.len() < LOOPBACK_PACKET_SIZE {
            return Err(AencError::Backend(format!(
                "loopback: 输出缓冲区过小 ({} 字节)",
                out.len()
            )));
        }
        let samples = consumed * channels;
        let peak = self.pending[..samples]
            .iter()
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
            .min(1.0);

        out[..4].copy_from_slice(&self.packets_emitted.to_be_bytes());
        out[4..6].copy_from_slice(&(frames as u16).to_be_bytes());
        out[6] = channels as u8;
        out[7] = (peak * 255.0).round() as u8;

        self.pending.drain(..samples);
        self.packets_emitted += 1;
        Ok(LOOPBACK_PACKET_SIZE)
    }
}

impl Default for LoopbackBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderBackend for LoopbackBackend {
    fn name(&self) -> &str {
        "loopback"
    }

    fn open(&mut self) -> AencResult<()> {
        self.opened = true;
        Ok(())
    }

    fn set_input_format(&mut self, format: &StreamFormat) -> AencResult<()> {
        self.require_open()?;
        if format.format_id != AudioFormatId::LinearPcm
            || format.sample_format != SampleFormat::F32
            || !(1..=8).contains(&format.channels)
            || format.sample_rate == 0
        {
            return Err(AencError::Backend(format!(
                "loopback: 不支持的输入格式 {} {}Hz {}ch",
                format.format_id, format.sample_rate, format.channels
            )));
        }
        self.input = Some(format.clone());
        Ok(())
    }

    fn set_output_format(&mut self, format: &StreamFormat) -> AencResult<()> {
        self.require_open()?;
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| AencError::Backend("loopback: 需要先设置输入格式".into()))?;
        if format.format_id == AudioFormatId::LinearPcm {
            return Err(AencError::Backend("loopback: 输出格式必须是 AAC".into()));
        }
        if format.channels != input.channels || format.sample_rate > input.sample_rate {
            return Err(AencError::Backend(format!(
                "loopback: 输出 {}Hz/{}ch 与输入 {}Hz/{}ch 不兼容",
                format.sample_rate, format.channels, input.sample_rate, input.channels
            )));
        }
        let mut output = format.clone();
        output.frames_per_packet = Self::frames_per_packet(format.format_id);
        self.output = Some(output);
        Ok(())
    }

    fn input_format(&self) -> AencResult<StreamFormat> {
        self.input
            .clone()
            .ok_or_else(|| AencError::Backend("loopback: 尚未设置输入格式".into()))
    }

    fn output_format(&self) -> AencResult<StreamFormat> {
        self.require_output().cloned()
    }

    fn bitrate_values(&self, set: BitrateValueSet) -> AencResult<Vec<i32>> {
        self.require_open()?;
        Ok(match set {
            BitrateValueSet::Limited => self.limited.clone(),
            BitrateValueSet::Available => self.available.clone(),
        })
    }

    fn apply_config(&mut self, config: &CodecConfig) -> AencResult<()> {
        let output = self.require_output()?;
        if config.profile.format_id() != output.format_id {
            return Err(AencError::Backend(format!(
                "loopback: 配置档次 {} 与输出格式 {} 不符",
                config.profile, output.format_id
            )));
        }
        debug!("loopback: 应用配置 {config:?}");
        self.config = Some(config.clone());
        Ok(())
    }

    fn max_output_packet_size(&self) -> AencResult<usize> {
        let output = self.require_output()?;
        Ok(MAX_BYTES_PER_CHANNEL * output.channels as usize)
    }

    fn magic_cookie(&self) -> AencResult<Vec<u8>> {
        let asc = Self::audio_specific_config(self.require_output()?)?;
        Ok(self.build_esds(&asc))
    }

    fn fill_buffer(&mut self, input: &mut dyn PcmInput, out: &mut [u8]) -> AencResult<FillOutcome> {
        let output = self.require_output()?.clone();
        let input_format = self.input_format()?;
        let frame_len = Self::input_frames_per_packet(&input_format, &output);
        let channels = output.channels as usize;

        while !self.input_done && self.pending.len() < frame_len * channels {
            let needed = frame_len - self.pending.len() / channels;
            let buf = input.pull(needed as u32);
            if buf.is_empty() {
                self.input_done = true;
                break;
            }
            let samples = (buf.frames as usize * channels).min(buf.data.len());
            self.pending.extend_from_slice(&buf.data[..samples]);
        }

        let consumed = (self.pending.len() / channels).min(frame_len);
        if consumed == 0 {
            return Ok(FillOutcome::default());
        }
        let frames = if consumed == frame_len {
            output.frames_per_packet as usize
        } else {
            Self::output_frames(consumed, &input_format, &output)
        };
        let bytes = self.write_packet(consumed, frames, channels, out)?;
        Ok(FillOutcome { bytes, packets: 1 })
    }

    fn close(&mut self) {
        if self.opened {
            debug!("loopback: 关闭, 共输出 {} 个数据包", self.packets_emitted);
        }
        self.opened = false;
        self.pending.clear();
    }
}
