//! 音量调节滤镜.
//!
//! 支持线性倍数 (`gain`) 和 dB (`db`) 两种方式指定增益, 同时给出时 `db` 优先.

use aenc_core::{AencError, AencResult, AudioStreamInfo, SplitOptions};

use crate::{AudioFilter, SampleWindow};

/// 识别的选项名
const VOLUME_OPTIONS: &[&str] = &["gain", "db"];

/// 音量调节滤镜
pub struct VolumeFilter {
    /// 上一级滤镜
    prev: Box<dyn AudioFilter>,
    /// 增益系数 (线性, 1.0 = 不变)
    gain: f64,
}

impl VolumeFilter {
    /// 使用线性增益创建 (1.0 = 不变, 2.0 = 加倍, 0.5 = 减半)
    pub fn new(prev: Box<dyn AudioFilter>, gain: f64) -> Self {
        Self { prev, gain }
    }

    /// 使用 dB 增益创建 (0 = 不变, 6 约 加倍, -6 约 减半)
    pub fn from_db(prev: Box<dyn AudioFilter>, db: f64) -> Self {
        Self::new(prev, 10.0_f64.powf(db / 20.0))
    }

    /// 工厂函数 (注册表使用)
    pub fn create(
        prev: Option<Box<dyn AudioFilter>>,
        opt_str: &str,
    ) -> AencResult<Box<dyn AudioFilter>> {
        let prev = prev.ok_or_else(|| {
            AencError::InvalidArgument("volume 不是源滤镜, 需要上一级滤镜".into())
        })?;
        let opts = SplitOptions::parse(opt_str, VOLUME_OPTIONS);
        let filter = match opts.get("db") {
            Some(_) => Self::from_db(prev, opts.get_f64("db", 0.0)),
            None => Self::new(prev, opts.get_f64("gain", 1.0)),
        };
        Ok(Box::new(filter))
    }

    /// 当前线性增益
    pub fn gain(&self) -> f64 {
        self.gain
    }
}

impl AudioFilter for VolumeFilter {
    fn name(&self) -> &str {
        "volume"
    }

    fn info(&self) -> &AudioStreamInfo {
        self.prev.info()
    }

    fn fetch_samples(&mut self, start: u64, end: u64) -> AencResult<Option<SampleWindow>> {
        let mut window = match self.prev.fetch_samples(start, end)? {
            Some(w) => w,
            None => return Ok(None),
        };
        for plane in &mut window.samples {
            for s in plane.iter_mut() {
                *s = (f64::from(*s) * self.gain) as f32;
            }
        }
        Ok(Some(window))
    }
}
