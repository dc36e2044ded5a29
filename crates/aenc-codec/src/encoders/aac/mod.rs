//! AAC 编码适配器.
//!
//! 把滤镜链尾接到一个外部 AAC 编码后端上, 提供 AAC-LC (`aac`) 与 HE-AAC (`aac_he`)
//! 两个变体. 初始化流程:
//!
//! 1. 按变体的采样率表/声道配置表检查链尾的输入格式
//! 2. 解析选项 (`is_vbr`, `bitrate`, `quality`, `samplerate`)
//! 3. 打开后端, 设置输入 (交错浮点 PCM) 与输出 (AAC) 格式
//! 4. 将码率/VBR 质量量化到后端合法值, 应用配置
//! 5. 读回实际格式, 建立输出流信息; 从 magic cookie 中取出 AudioSpecificConfig
//!
//! 任何一步失败都会关闭后端并返回错误. 之后的编码过程由 [`FramePump`] 与
//! [`PacketEmitter`] 完成.

use std::sync::Arc;

use aenc_core::{AencError, AencResult, AudioStreamInfo, SplitOptions};
use aenc_filter::AudioFilter;
use log::{error, info, warn};

use crate::backend::{BitrateValueSet, EncoderBackend, StreamFormat};
use crate::channel_map::MAX_CHANNELS;
use crate::codec_config::{
    AacProfile, BitrateControlMode, CodecConfig, DEFAULT_VBR_QUALITY, EncoderQuality, RateTarget,
};
use crate::emitter::PacketEmitter;
use crate::encoder::AudioEncoder;
use crate::esds;
use crate::packet::CompressedPacket;
use crate::pump::{FramePump, PumpState};
use crate::quantizer::{quantize_bitrate, quantize_vbr_quality};


/// 识别的选项名 (位置选项顺序)
pub const ENCODER_OPTIONS: &[&str] = &["is_vbr", "bitrate", "quality", "samplerate"];

/// magic cookie 的最大长度
pub const MAX_COOKIE_SIZE: usize = 1024;

/// `next_packet` 中连续无数据包的编码调用上限
pub const MAX_EMPTY_FILLS: u32 = 64;

/// 解析后的编码选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderOptions {
    /// 是否为 VBR
    pub is_vbr: bool,
    /// VBR 时为质量值, 否则为码率 (kbps)
    pub bitrate: i32,
    /// 质量档位
    pub quality: EncoderQuality,
    /// 输出采样率 (Hz)
    pub sample_rate: u32,
}

impl EncoderOptions {
    /// 解析选项串, `input_rate` 为链尾采样率
    pub fn parse(profile: AacProfile, opt_str: &str, input_rate: u32) -> AencResult<Self> {
        let opts = SplitOptions::parse(opt_str, ENCODER_OPTIONS);

        let is_vbr = if profile.supports_vbr() {
            opts.get_bool("is_vbr", true)
        } else {
            if opts.get_bool("is_vbr", false) {
                warn!("{}: {profile} 不支持 VBR, 使用平均码率", profile.codec_name());
            }
            false
        };

        let default_bitrate = if is_vbr {
            DEFAULT_VBR_QUALITY
        } else {
            profile.default_bitrate()
        };
        let bitrate = opts.get_i32("bitrate", default_bitrate);

        let quality_index = opts.get_i32("quality", EncoderQuality::Medium as i32);
        let quality = EncoderQuality::from_index(quality_index).ok_or_else(|| {
            AencError::Config(format!("无效的质量档位 {quality_index}, 可选 0 (medium) - 2 (highest)"))
        })?;

        let sample_rate = opts.get_i32("samplerate", i32::try_from(input_rate).unwrap_or(i32::MAX));
        let sample_rate = u32::try_from(sample_rate)
            .ok()
            .filter(|&r| r > 0)
            .ok_or_else(|| AencError::Config(format!("无效的输出采样率 {sample_rate}")))?;

        Ok(Self {
            is_vbr,
            bitrate,
            quality,
            sample_rate,
        })
    }
}

/// 协商结果
struct Negotiated {
    config: CodecConfig,
    info: AudioStreamInfo,
    max_packet_size: usize,
}

/// 把后端错误包装为协商错误
fn rejected(what: &'static str) -> impl FnOnce(AencError) -> AencError {
    move |e| match e {
        AencError::Negotiation(_) => e,
        other => AencError::Negotiation(format!("{what}: {other}")),
    }
}

/// AAC 编码适配器
pub struct AacEncoder {
    /// 编码档次
    profile: AacProfile,
    /// 已应用的配置
    config: CodecConfig,
    /// 输出流信息
    info: Arc<AudioStreamInfo>,
    /// 编码后端
    backend: Box<dyn EncoderBackend>,
    /// 帧泵 (持有链尾)
    pump: FramePump,
    /// 数据包发射器
    emitter: PacketEmitter,
}

impl AacEncoder {
    /// 创建适配器并完成后端协商
    pub fn open(
        profile: AacProfile,
        chain: Box<dyn AudioFilter>,
        opt_str: &str,
        mut backend: Box<dyn EncoderBackend>,
    ) -> AencResult<Self> {
        let input = chain.info().clone();
        if profile.channel_config_index(input.channels).is_none()
            || profile.samplerate_index(input.sample_rate).is_none()
        {
            error!(
                "{}: 不支持的输入采样率或声道配置 ({}Hz, {}ch)",
                profile.codec_name(),
                input.sample_rate,
                input.channels
            );
            return Err(AencError::Config(format!(
                "{profile} 不支持 {}Hz/{}ch 输入",
                input.sample_rate, input.channels
            )));
        }

        let negotiated = match Self::init_common(profile, &input, opt_str, backend.as_mut()) {
            Ok(n) => n,
            Err(e) => {
                error!("{}: 初始化音频编码器失败: {e}", profile.codec_name());
                backend.close();
                return Err(e);
            }
        };

        let Negotiated {
            config,
            info,
            max_packet_size,
        } = negotiated;
        Self::log_opened(profile, &config, &info);

        let info = Arc::new(info);
        let pump = FramePump::new(chain, info.channels, info.frame_len);
        let emitter = PacketEmitter::new(max_packet_size, Arc::clone(&info));
        Ok(Self {
            profile,
            config,
            info,
            backend,
            pump,
            emitter,
        })
    }

    /// AAC-LC 工厂函数 (注册表使用)
    pub fn create_lc(
        chain: Box<dyn AudioFilter>,
        opt_str: &str,
        backend: Box<dyn EncoderBackend>,
    ) -> AencResult<Box<dyn AudioEncoder>> {
        Ok(Box::new(Self::open(AacProfile::Lc, chain, opt_str, backend)?))
    }

    /// HE-AAC 工厂函数 (注册表使用)
    pub fn create_he(
        chain: Box<dyn AudioFilter>,
        opt_str: &str,
        backend: Box<dyn EncoderBackend>,
    ) -> AencResult<Box<dyn AudioEncoder>> {
        Ok(Box::new(Self::open(AacProfile::He, chain, opt_str, backend)?))
    }

    /// 已应用的配置
    pub fn codec_config(&self) -> &CodecConfig {
        &self.config
    }

    /// 帧泵状态
    pub fn pump_state(&self) -> PumpState {
        self.pump.state()
    }

    fn init_common(
        profile: AacProfile,
        input: &AudioStreamInfo,
        opt_str: &str,
        backend: &mut dyn EncoderBackend,
    ) -> AencResult<Negotiated> {
        if input.channels as usize > MAX_CHANNELS {
            return Err(AencError::Config(format!(
                "不支持 {} 声道音频",
                input.channels
            )));
        }

        let opts = EncoderOptions::parse(profile, opt_str, input.sample_rate)?;
        if opts.sample_rate > input.sample_rate {
            return Err(AencError::Config(format!(
                "输出采样率 {}Hz 高于输入 {}Hz, 请换一个值或去掉 samplerate 选项",
                opts.sample_rate, input.sample_rate
            )));
        }
        let samplerate_index = profile.samplerate_index(opts.sample_rate).ok_or_else(|| {
            AencError::Config(format!(
                "无效的输出采样率 {}Hz, 请换一个值或去掉 samplerate 选项",
                opts.sample_rate
            ))
        })?;
        let channel_config_index = profile.channel_config_index(input.channels).ok_or_else(|| {
            AencError::Config(format!("不支持 {} 声道音频", input.channels))
        })?;

        backend.open()?;
        Self::negotiate(
            profile,
            input,
            &opts,
            samplerate_index,
            channel_config_index,
            backend,
        )
    }

    fn negotiate(
        profile: AacProfile,
        input: &AudioStreamInfo,
        opts: &EncoderOptions,
        samplerate_index: u32,
        channel_config_index: u32,
        backend: &mut dyn EncoderBackend,
    ) -> AencResult<Negotiated> {
        backend
            .set_input_format(&StreamFormat::pcm_f32(input.sample_rate, input.channels))
            .map_err(rejected("输入格式被拒绝"))?;
        backend
            .set_output_format(&StreamFormat::compressed(
                profile.format_id(),
                opts.sample_rate,
                input.channels,
            ))
            .map_err(rejected("输出格式被拒绝"))?;

        let rate = if opts.is_vbr {
            let q = quantize_vbr_quality(opts.bitrate);
            RateTarget::VbrQuality {
                index: q.index,
                value: q.value,
            }
        } else {
            let limited = backend.bitrate_values(BitrateValueSet::Limited)?;
            let available = backend.bitrate_values(BitrateValueSet::Available)?;
            let q = quantize_bitrate(opts.bitrate, &limited, &available)?;
            RateTarget::Bitrate {
                index: q.index,
                kbps: q.value,
            }
        };

        let config = CodecConfig {
            profile,
            is_vbr: opts.is_vbr,
            mode: BitrateControlMode::select(profile, opts.is_vbr),
            quality: opts.quality,
            rate,
            samplerate_index,
            channel_config_index,
        };
        backend
            .apply_config(&config)
            .map_err(rejected("编码配置被拒绝"))?;

        let in_fmt = backend.input_format()?;
        let out_fmt = backend.output_format()?;
        if in_fmt.channels != input.channels || out_fmt.channels != input.channels {
            return Err(AencError::Negotiation(format!(
                "后端声道数 (输入 {}, 输出 {}) 与链尾 {} 不一致",
                in_fmt.channels, out_fmt.channels, input.channels
            )));
        }
        if out_fmt.frames_per_packet == 0 || out_fmt.sample_rate == 0 {
            return Err(AencError::Negotiation(
                "后端输出格式缺少采样率或帧长".into(),
            ));
        }

        let mut info = AudioStreamInfo::raw_f32(out_fmt.sample_rate, out_fmt.channels);
        info.set_frame_len(out_fmt.frames_per_packet);

        let max_packet_size = backend.max_output_packet_size()?;
        if max_packet_size == 0 {
            return Err(AencError::Negotiation("后端最大输出包大小为 0".into()));
        }

        let cookie = backend.magic_cookie()?;
        if cookie.len() > MAX_COOKIE_SIZE {
            return Err(AencError::Negotiation(format!(
                "magic cookie 过长 ({} > {MAX_COOKIE_SIZE} 字节)",
                cookie.len()
            )));
        }
        info.extra_data = esds::read_audio_specific_config(&cookie)?.to_vec();

        Ok(Negotiated {
            config,
            info,
            max_packet_size,
        })
    }

    fn log_opened(profile: AacProfile, config: &CodecConfig, info: &AudioStreamInfo) {
        let rate = match config.rate {
            RateTarget::Bitrate { kbps, .. } => format!("bitrate: {kbps}kbps"),
            RateTarget::VbrQuality { value, .. } => format!("VBR: {value}"),
        };
        info!(
            "已打开 {} 编码器 ({profile} {rate}, quality: {}, samplerate: {}Hz)",
            profile.codec_name(),
            config.quality.name(),
            info.sample_rate
        );
    }
}

impl AudioEncoder for AacEncoder {
    fn codec_name(&self) -> &str {
        self.profile.codec_name()
    }

    fn stream_info(&self) -> &AudioStreamInfo {
        &self.info
    }

    fn next_packet(&mut self) -> Option<CompressedPacket> {
        if self.pump.is_finishing() {
            return None;
        }
        for _ in 0..MAX_EMPTY_FILLS {
            if let Some(packet) = self.emitter.fill(self.backend.as_mut(), &mut self.pump) {
                return Some(packet);
            }
            if self.pump.is_finishing() {
                return None;
            }
        }
        error!(
            "{}: 连续 {MAX_EMPTY_FILLS} 次编码调用没有产出数据包, 强制结束",
            self.codec_name()
        );
        self.pump.terminate();
        None
    }

    fn skip_samples(&mut self, count: u64) {
        self.pump.skip_samples(count);
    }

    fn finish(&mut self) -> Option<CompressedPacket> {
        if self.pump.is_terminal() {
            return None;
        }
        self.pump.begin_drain();
        let packet = self.emitter.fill(self.backend.as_mut(), &mut self.pump);
        self.pump.terminate();
        packet
    }
}

impl Drop for AacEncoder {
    fn drop(&mut self) {
        self.backend.close();
    }
}
