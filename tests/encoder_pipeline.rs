//! 端到端集成测试: 滤镜链 → 编码适配层 → 后端.
//!
//! 使用文件内的脚本化后端观察协商顺序、应用的配置和拉取到的 PCM,
//! 以及回环后端验证完整的数据包序列.

use std::sync::{Arc, Mutex};

use bytes::{BufMut, BytesMut};

use aenc::codec::{
    AacProfile, AudioEncoder, BitrateControlMode, BitrateValueSet, CodecConfig, EncoderBackend,
    EncoderId, FillOutcome, LoopbackBackend, PcmInput, RateTarget, StreamFormat,
};
use aenc::core::{AencError, AencResult, Rational};
use aenc::filter::{AudioFilter, AudioFilterId, BufferSource};

/// 脚本化后端给出的 AudioSpecificConfig
const SCRIPTED_ASC: [u8; 2] = [0x12, 0x10];

/// 单字节长度形式的 esds: 0x03 { 0x04 { 0x05 { asc } } 0x06 }
const SCRIPTED_COOKIE: [u8; 27] = [
    0x03, 0x19, 0x00, 0x01, 0x00, // ES_Descriptor
    0x04, 0x11, 0x40, 0x15, 0x00, 0x00, 0x00, 0x00, 0x01, 0xF4, 0x00, 0x00, 0x01, 0xF4,
    0x00, // DecoderConfigDescriptor
    0x05, 0x02, 0x12, 0x10, // DecoderSpecificInfo
    0x06, 0x01, 0x02, // SLConfigDescriptor
];

/// 脚本化后端的调用记录
#[derive(Debug, Default)]
struct Journal {
    calls: Vec<&'static str>,
    config: Option<CodecConfig>,
    first_pull: Vec<f32>,
    pulled_frames: u64,
}

/// 每次编码调用只拉取一次, 拉到多少就输出多少, 不做跨调用缓存
struct ScriptedBackend {
    journal: Arc<Mutex<Journal>>,
    limited: Vec<i32>,
    available: Vec<i32>,
    input: Option<StreamFormat>,
    output: Option<StreamFormat>,
    frame_len: u32,
}

impl ScriptedBackend {
    fn new(limited: Vec<i32>, available: Vec<i32>) -> (Self, Arc<Mutex<Journal>>) {
        let journal = Arc::new(Mutex::new(Journal::default()));
        let backend = Self {
            journal: Arc::clone(&journal),
            limited,
            available,
            input: None,
            output: None,
            frame_len: 1024,
        };
        (backend, journal)
    }

    fn record(&self, call: &'static str) {
        self.journal.lock().unwrap().calls.push(call);
    }
}

impl EncoderBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn open(&mut self) -> AencResult<()> {
        self.record("open");
        Ok(())
    }

    fn set_input_format(&mut self, format: &StreamFormat) -> AencResult<()> {
        self.record("set_input_format");
        self.input = Some(format.clone());
        Ok(())
    }

    fn set_output_format(&mut self, format: &StreamFormat) -> AencResult<()> {
        self.record("set_output_format");
        let mut output = format.clone();
        output.frames_per_packet = self.frame_len;
        self.output = Some(output);
        Ok(())
    }

    fn input_format(&self) -> AencResult<StreamFormat> {
        self.record("input_format");
        self.input
            .clone()
            .ok_or_else(|| AencError::Backend("未设置输入格式".into()))
    }

    fn output_format(&self) -> AencResult<StreamFormat> {
        self.record("output_format");
        self.output
            .clone()
            .ok_or_else(|| AencError::Backend("未设置输出格式".into()))
    }

    fn bitrate_values(&self, set: BitrateValueSet) -> AencResult<Vec<i32>> {
        self.record("bitrate_values");
        Ok(match set {
            BitrateValueSet::Limited => self.limited.clone(),
            BitrateValueSet::Available => self.available.clone(),
        })
    }

    fn apply_config(&mut self, config: &CodecConfig) -> AencResult<()> {
        self.record("apply_config");
        self.journal.lock().unwrap().config = Some(config.clone());
        Ok(())
    }

    fn max_output_packet_size(&self) -> AencResult<usize> {
        self.record("max_output_packet_size");
        Ok(16)
    }

    fn magic_cookie(&self) -> AencResult<Vec<u8>> {
        self.record("magic_cookie");
        Ok(SCRIPTED_COOKIE.to_vec())
    }

    fn fill_buffer(&mut self, input: &mut dyn PcmInput, out: &mut [u8]) -> AencResult<FillOutcome> {
        let buf = input.pull(self.frame_len);
        if buf.is_empty() {
            return Ok(FillOutcome::default());
        }
        let mut journal = self.journal.lock().unwrap();
        if journal.first_pull.is_empty() {
            let first_frame = (buf.channels as usize).min(buf.data.len());
            journal.first_pull = buf.data[..first_frame].to_vec();
        }
        journal.pulled_frames += u64::from(buf.frames);

        let header = buf.frames.to_be_bytes();
        out[..4].copy_from_slice(&header);
        Ok(FillOutcome {
            bytes: 4,
            packets: 1,
        })
    }

    fn close(&mut self) {
        self.record("close");
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 每个声道平面填充为声道序号, 便于观察重排
fn indexed_planes(channels: usize, samples: usize) -> Box<dyn AudioFilter> {
    let planes = (0..channels).map(|ch| vec![ch as f32; samples]).collect();
    Box::new(BufferSource::new(48000, planes).unwrap())
}

fn open_scripted(
    chain: Box<dyn AudioFilter>,
    opt_str: &str,
    backend: ScriptedBackend,
) -> AencResult<Box<dyn AudioEncoder>> {
    aenc::default_encoder_registry().create(EncoderId::Aac, chain, opt_str, Box::new(backend))
}

#[test]
fn test_协商顺序与流信息() {
    init_logger();
    let (backend, journal) = ScriptedBackend::new(vec![32, 256], vec![32, 64, 96, 128, 256]);
    let enc = open_scripted(indexed_planes(2, 4096), "is_vbr=0:bitrate=100", backend).unwrap();

    assert_eq!(
        journal.lock().unwrap().calls,
        vec![
            "open",
            "set_input_format",
            "set_output_format",
            "bitrate_values",
            "bitrate_values",
            "apply_config",
            "input_format",
            "output_format",
            "max_output_packet_size",
            "magic_cookie",
        ]
    );

    let config = journal.lock().unwrap().config.clone().unwrap();
    assert_eq!(config.profile, AacProfile::Lc);
    assert_eq!(config.mode, BitrateControlMode::LcAbr);
    assert_eq!(config.rate, RateTarget::Bitrate { index: 2, kbps: 96 });
    assert_eq!(config.samplerate_index, 9);

    let info = enc.stream_info();
    assert_eq!(info.extra_data, SCRIPTED_ASC.to_vec());
    assert_eq!(info.frame_len, 1024);
    assert_eq!(info.frame_size, 1024 * 8);
    assert_eq!(info.time_base, Rational::new(1, 48000));

    enc.close();
    assert_eq!(journal.lock().unwrap().calls.last(), Some(&"close"));
}

#[test]
fn test_六声道按后端顺序交错() {
    init_logger();
    let (backend, journal) = ScriptedBackend::new(vec![64, 320], vec![64, 320]);
    let mut enc = open_scripted(indexed_planes(6, 1024), "", backend).unwrap();

    let packet = enc.next_packet().unwrap();
    assert_eq!(packet.dts, 0);
    assert_eq!(journal.lock().unwrap().first_pull, vec![2.0, 0.0, 1.0, 4.0, 5.0, 3.0]);
}

#[test]
fn test_三帧输入时间戳连续() {
    init_logger();
    let (backend, journal) = ScriptedBackend::new(vec![64, 320], vec![64, 320]);
    let mut enc = open_scripted(indexed_planes(2, 3 * 1024), "", backend).unwrap();

    let mut packets = Vec::new();
    while let Some(packet) = enc.next_packet() {
        packets.push(packet);
    }
    assert!(enc.finish().is_none());

    let dts: Vec<i64> = packets.iter().map(|p| p.dts).collect();
    assert_eq!(dts, vec![0, 1024, 2048]);
    assert!(packets.iter().all(|p| p.duration == 1024 && p.size() == 4));
    assert_eq!(journal.lock().unwrap().pulled_frames, 3 * 1024);
}

#[test]
fn test_尾部不足一帧() {
    init_logger();
    let (backend, journal) = ScriptedBackend::new(vec![64, 320], vec![64, 320]);
    let mut enc = open_scripted(indexed_planes(1, 2500), "", backend).unwrap();

    let mut last = None;
    let mut count = 0;
    while let Some(packet) = enc.next_packet() {
        count += 1;
        last = Some(packet);
    }
    let last = last.unwrap();
    assert_eq!(count, 3);
    assert_eq!(last.dts, 2048);
    assert_eq!(u32::from_be_bytes([last.data[0], last.data[1], last.data[2], last.data[3]]), 452);
    assert_eq!(journal.lock().unwrap().pulled_frames, 2500);
}

#[test]
fn test_配置错误不打开后端() {
    init_logger();
    let (backend, journal) = ScriptedBackend::new(vec![64, 320], vec![64, 320]);
    let result = open_scripted(indexed_planes(3, 1024), "", backend);
    assert!(matches!(result, Err(AencError::Config(_))));
    assert!(!journal.lock().unwrap().calls.contains(&"open"));
}

#[test]
fn test_乱序码率表是协商错误() {
    init_logger();
    let (backend, journal) = ScriptedBackend::new(vec![64, 320], vec![128, 64, 320]);
    let result = open_scripted(indexed_planes(2, 1024), "is_vbr=0", backend);
    assert!(matches!(result, Err(AencError::Negotiation(_))));
    let journal = journal.lock().unwrap();
    assert!(!journal.calls.contains(&"apply_config"));
    assert_eq!(journal.calls.last(), Some(&"close"));
}

/// 生成 16 位立体声 WAV 文件内容
fn build_wav_s16(sample_rate: u32, frames: usize) -> Vec<u8> {
    let channels: u16 = 2;
    let data_size = (frames * usize::from(channels) * 2) as u32;

    let mut buf = BytesMut::with_capacity(44 + data_size as usize);
    buf.put_slice(b"RIFF");
    buf.put_u32_le(36 + data_size);
    buf.put_slice(b"WAVE");
    buf.put_slice(b"fmt ");
    buf.put_u32_le(16);
    buf.put_u16_le(1);
    buf.put_u16_le(channels);
    buf.put_u32_le(sample_rate);
    buf.put_u32_le(sample_rate * u32::from(channels) * 2);
    buf.put_u16_le(channels * 2);
    buf.put_u16_le(16);
    buf.put_slice(b"data");
    buf.put_u32_le(data_size);
    for i in 0..frames {
        let t = i as f64 / f64::from(sample_rate);
        let v = ((t * 440.0 * 2.0 * std::f64::consts::PI).sin() * 16000.0) as i16;
        buf.put_i16_le(v);
        buf.put_i16_le(-v);
    }
    buf.to_vec()
}

#[test]
fn test_wav_文件经音量滤镜编码() {
    init_logger();
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("input.wav");
    std::fs::write(&path, build_wav_s16(44100, 2 * 1024 + 100)).unwrap();

    let filters = aenc::default_filter_registry();
    let source = filters
        .create(
            AudioFilterId::Wav,
            None,
            &format!("filename={}", path.display()),
        )
        .unwrap();
    let chain = filters
        .create(AudioFilterId::Volume, Some(source), "db=-6")
        .unwrap();

    let mut enc = aenc::default_encoder_registry()
        .create_by_name(
            "aac",
            chain,
            "is_vbr=0:bitrate=128",
            Box::new(LoopbackBackend::new()),
        )
        .unwrap();
    assert_eq!(enc.stream_info().sample_rate, 44100);
    assert_eq!(enc.stream_info().extra_data, vec![0x12, 0x10]);

    let mut frames = Vec::new();
    while let Some(packet) = enc.next_packet() {
        frames.push(u16::from_be_bytes([packet.data[4], packet.data[5]]));
    }
    assert!(enc.finish().is_none());
    assert_eq!(frames, vec![1024, 1024, 100]);
}

#[test]
fn test_he_编码器经注册表创建() {
    init_logger();
    let filters = aenc::default_filter_registry();
    let chain = filters
        .create(AudioFilterId::Tone, None, "samplerate=44100:duration=0.1")
        .unwrap();
    let mut enc = aenc::default_encoder_registry()
        .create_by_name("aac_he", chain, "", Box::new(LoopbackBackend::new()))
        .unwrap();

    assert_eq!(enc.codec_name(), "aac_he");
    assert_eq!(enc.stream_info().frame_len, 2048);
    assert_eq!(enc.stream_info().extra_data.len(), 4);

    // 4410 采样 = 2 个整帧 + 314 采样的尾包
    let dts: Vec<i64> = std::iter::from_fn(|| enc.next_packet())
        .map(|p| p.dts)
        .collect();
    assert_eq!(dts, vec![0, 2048, 4096]);
}
