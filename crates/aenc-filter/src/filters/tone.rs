//! 正弦波源.
//!
//! 选项: `frequency` (Hz, 默认 440), `samplerate` (默认 48000), `channels` (默认 2),
//! `duration` (秒, 默认 1.0), `amplitude` (默认 0.5). 所有声道输出相同的波形.

use std::f64::consts::PI;

use aenc_core::{AencError, AencResult, AudioStreamInfo, SplitOptions};
use log::debug;

use crate::{AudioFilter, SampleWindow};

/// 识别的选项名 (位置选项顺序)
const TONE_OPTIONS: &[&str] = &["frequency", "samplerate", "channels", "duration", "amplitude"];

/// 正弦波源
pub struct ToneSource {
    /// 流信息
    info: AudioStreamInfo,
    /// 频率 (Hz)
    frequency: f64,
    /// 振幅
    amplitude: f64,
    /// 每声道总采样数
    total_samples: u64,
}

impl ToneSource {
    /// 创建正弦波源
    pub fn new(
        frequency: f64,
        sample_rate: u32,
        channels: u32,
        total_samples: u64,
        amplitude: f64,
    ) -> AencResult<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(AencError::InvalidArgument(format!(
                "tone: 无效的采样率/声道数 {sample_rate}Hz/{channels}ch"
            )));
        }
        Ok(Self {
            info: AudioStreamInfo::raw_f32(sample_rate, channels),
            frequency,
            amplitude,
            total_samples,
        })
    }

    /// 工厂函数 (注册表使用)
    pub fn create(
        prev: Option<Box<dyn AudioFilter>>,
        opt_str: &str,
    ) -> AencResult<Box<dyn AudioFilter>> {
        if prev.is_some() {
            return Err(AencError::InvalidArgument("tone 是源滤镜, 不能接在其他滤镜之后".into()));
        }
        let opts = SplitOptions::parse(opt_str, TONE_OPTIONS);
        let sample_rate = opts.get_i32("samplerate", 48000).max(0) as u32;
        let duration = opts.get_f64("duration", 1.0).max(0.0);
        let total_samples = (duration * f64::from(sample_rate)).round() as u64;
        let tone = Self::new(
            opts.get_f64("frequency", 440.0),
            sample_rate,
            opts.get_i32("channels", 2).max(0) as u32,
            total_samples,
            opts.get_f64("amplitude", 0.5),
        )?;
        debug!(
            "tone: {}Hz, {}Hz/{}ch, {} 采样",
            tone.frequency, sample_rate, tone.info.channels, total_samples
        );
        Ok(Box::new(tone))
    }
}

impl AudioFilter for ToneSource {
    fn name(&self) -> &str {
        "tone"
    }

    fn info(&self) -> &AudioStreamInfo {
        &self.info
    }

    fn fetch_samples(&mut self, start: u64, end: u64) -> AencResult<Option<SampleWindow>> {
        if start >= self.total_samples || end <= start {
            return Ok(None);
        }
        let end = end.min(self.total_samples);
        let step = 2.0 * PI * self.frequency / f64::from(self.info.sample_rate);
        let wave: Vec<f32> = (start..end)
            .map(|n| (self.amplitude * (step * n as f64).sin()) as f32)
            .collect();

        let mut window = SampleWindow::new(vec![wave; self.info.channels as usize], start);
        if end == self.total_samples {
            window.mark_eof();
        }
        Ok(Some(window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_选项解析() {
        let tone = ToneSource::create(None, "1000:8000:1:0.5").unwrap();
        assert_eq!(tone.info().sample_rate, 8000);
        assert_eq!(tone.info().channels, 1);
    }

    #[test]
    fn test_总长度与eof() {
        let mut tone = ToneSource::create(None, "samplerate=1000:duration=1").unwrap();
        let w = tone.fetch_samples(900, 1100).unwrap().unwrap();
        assert_eq!(w.sample_count, 100);
        assert!(w.is_eof());
        assert!(tone.fetch_samples(1000, 1100).unwrap().is_none());
    }

    #[test]
    fn test_波形连续() {
        let mut tone = ToneSource::create(None, "frequency=100:samplerate=8000:channels=2").unwrap();
        let a = tone.fetch_samples(0, 20).unwrap().unwrap();
        let b = tone.fetch_samples(10, 20).unwrap().unwrap();
        assert_eq!(&a.samples[0][10..], &b.samples[0][..]);
        assert_eq!(a.samples[0], a.samples[1]);
        assert_eq!(a.samples[0][0], 0.0);
    }

    #[test]
    fn test_不能接在其他滤镜之后() {
        let prev = ToneSource::create(None, "").unwrap();
        assert!(ToneSource::create(Some(prev), "").is_err());
    }
}
