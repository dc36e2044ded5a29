//! 帧泵: 后端的 PCM 输入回调.
//!
//! 后端在 `fill_buffer` 期间通过 [`PcmInput::pull`] 向帧泵要数据, 帧泵再从
//! 滤镜链尾按采样区间取样, 重排声道并交错后交给后端.
//!
//! 状态转换:
//!
//! ```text
//! Running  --(链尾返回空 / 上一个窗口带 EOF / 取样出错 / finish)-->  Draining
//! Draining --(下一次 pull)-->                                        Terminal
//! ```
//!
//! `Draining` 时的第一次 pull 返回空并转入 `Terminal`, 之后所有 pull 都返回空.
//! 当前窗口在下一次 pull 时被取代, 交错缓冲区同样只在两次 pull 之间有效.

use aenc_filter::{AudioFilter, SampleWindow};
use log::{debug, error, warn};

use crate::backend::{InputBuffer, PcmInput};
use crate::channel_map;

/// 取样位置上限
const MAX_POSITION: u64 = i64::MAX as u64;

/// 帧泵状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    /// 正常取样
    Running,
    /// 输入已耗尽, 等待后端冲刷
    Draining,
    /// 不再产出任何数据
    Terminal,
}

/// 帧泵
pub struct FramePump {
    /// 滤镜链尾
    chain: Box<dyn AudioFilter>,
    /// 声道数
    channels: u32,
    /// 每次最多取样的采样数 (压缩帧长度)
    frame_len: u32,
    /// 当前状态
    state: PumpState,
    /// 当前窗口
    window: Option<SampleWindow>,
    /// 交错输出缓冲
    interleaved: Vec<f32>,
    /// 下一次取样的起点
    last_sample: u64,
    /// 下一个数据包的解码时间戳, 首次取样前未知
    last_dts: Option<i64>,
}

impl FramePump {
    /// 创建帧泵
    pub fn new(chain: Box<dyn AudioFilter>, channels: u32, frame_len: u32) -> Self {
        Self {
            chain,
            channels,
            frame_len,
            state: PumpState::Running,
            window: None,
            interleaved: Vec::with_capacity(frame_len as usize * channels as usize),
            last_sample: 0,
            last_dts: None,
        }
    }

    /// 当前状态
    pub fn state(&self) -> PumpState {
        self.state
    }

    /// 是否已离开 `Running`
    pub fn is_finishing(&self) -> bool {
        self.state != PumpState::Running
    }

    /// 是否已进入 `Terminal`
    pub fn is_terminal(&self) -> bool {
        self.state == PumpState::Terminal
    }

    /// 下一次取样的起点
    pub fn last_sample(&self) -> u64 {
        self.last_sample
    }

    /// 跳过 `count` 个采样
    ///
    /// 位置上限为 `i64::MAX`, 保证时间戳不会溢出为负数.
    pub fn skip_samples(&mut self, count: u64) {
        self.last_sample = self.last_sample.saturating_add(count).min(MAX_POSITION);
    }

    /// 进入 `Draining` (已处于收尾阶段时不变)
    pub fn begin_drain(&mut self) {
        if self.state == PumpState::Running {
            self.enter_draining();
        }
    }

    /// 直接进入 `Terminal`
    pub fn terminate(&mut self) {
        self.state = PumpState::Terminal;
        self.window = None;
        self.interleaved.clear();
    }

    /// 为新数据包分配解码时间戳, 并前移 `frame_len`
    pub fn next_dts(&mut self, frame_len: u32) -> i64 {
        let dts = self.last_dts.unwrap_or(self.last_sample as i64);
        self.last_dts = Some(dts.saturating_add(i64::from(frame_len)));
        dts
    }

    fn enter_draining(&mut self) {
        debug!("帧泵: 输入耗尽, 进入收尾阶段 (位置 {})", self.last_sample);
        self.state = PumpState::Draining;
        self.window = None;
        self.interleaved.clear();
    }

    /// 从链尾取一个窗口, 取不到时进入 `Draining`
    fn fetch_window(&mut self, len: u64) -> Option<SampleWindow> {
        let start = self.last_sample;
        let Some(end) = start.checked_add(len).filter(|&end| end <= MAX_POSITION) else {
            warn!("帧泵: 取样位置 {start} 已到上限");
            self.enter_draining();
            return None;
        };
        match self.chain.fetch_samples(start, end) {
            Ok(Some(w)) if w.sample_count > 0 => Some(w),
            Ok(_) => {
                self.enter_draining();
                None
            }
            Err(e) => {
                warn!("帧泵: 从 {} 取样 [{start}, {}) 失败: {e}", self.chain.name(), end);
                self.enter_draining();
                None
            }
        }
    }
}

impl PcmInput for FramePump {
    fn pull(&mut self, requested: u32) -> InputBuffer<'_> {
        match self.state {
            PumpState::Terminal => return InputBuffer::empty(self.channels),
            PumpState::Draining => {
                self.terminate();
                return InputBuffer::empty(self.channels);
            }
            PumpState::Running => {}
        }

        // 上一个窗口已是最后一个
        if self.window.take().is_some_and(|w| w.is_eof()) {
            self.enter_draining();
            return InputBuffer::empty(self.channels);
        }

        let len = if requested == 0 {
            self.frame_len
        } else {
            requested.min(self.frame_len)
        };
        let Some(mut window) = self.fetch_window(u64::from(len)) else {
            return InputBuffer::empty(self.channels);
        };

        if window.channels() != self.channels as usize {
            error!(
                "帧泵: 链尾返回 {} 声道, 期望 {} 声道",
                window.channels(),
                self.channels
            );
            self.enter_draining();
            return InputBuffer::empty(self.channels);
        }
        let planes_len = window.samples.iter().map(Vec::len).min().unwrap_or(0);
        if window.sample_count > planes_len {
            error!(
                "帧泵: 链尾窗口声明 {} 个采样, 实际只有 {planes_len} 个",
                window.sample_count
            );
            self.enter_draining();
            return InputBuffer::empty(self.channels);
        }
        if window.sample_count > len as usize {
            for plane in &mut window.samples {
                plane.truncate(len as usize);
            }
            window.sample_count = len as usize;
        }
        if window.sample_count < len as usize {
            window.mark_eof();
        }

        if self.last_dts.is_none() {
            self.last_dts = Some(self.last_sample as i64);
        }
        self.last_sample += window.sample_count as u64;

        if let Err(e) = channel_map::remap_channels(&mut window.samples) {
            error!("帧泵: 声道重排失败: {e}");
            self.enter_draining();
            return InputBuffer::empty(self.channels);
        }
        window.interleave_into(&mut self.interleaved);

        let frames = window.sample_count as u32;
        self.window = Some(window);
        InputBuffer {
            data: &self.interleaved,
            frames,
            channels: self.channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aenc_core::{AencError, AencResult, AudioStreamInfo};
    use aenc_filter::BufferSource;

    fn pump_over(planes: Vec<Vec<f32>>, frame_len: u32) -> FramePump {
        let channels = planes.len() as u32;
        let src = BufferSource::new(48000, planes).unwrap();
        FramePump::new(Box::new(src), channels, frame_len)
    }

    /// 第一次取样成功, 之后总是出错
    struct FlakySource {
        info: AudioStreamInfo,
        calls: u32,
    }

    impl AudioFilter for FlakySource {
        fn name(&self) -> &str {
            "flaky"
        }

        fn info(&self) -> &AudioStreamInfo {
            &self.info
        }

        fn fetch_samples(&mut self, start: u64, end: u64) -> AencResult<Option<SampleWindow>> {
            self.calls += 1;
            if self.calls > 1 {
                return Err(AencError::InvalidData("坏数据".into()));
            }
            Ok(Some(SampleWindow::new(vec![vec![0.0; (end - start) as usize]], start)))
        }
    }

    #[test]
    fn test_按帧取样并交错() {
        let mut pump = pump_over(vec![vec![1.0; 8], vec![2.0; 8]], 4);
        let buf = pump.pull(4);
        assert_eq!(buf.frames, 4);
        assert_eq!(buf.data, &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
        assert_eq!(pump.last_sample(), 4);
    }

    #[test]
    fn test_请求量受帧长限制() {
        let mut pump = pump_over(vec![vec![0.0; 100]], 16);
        assert_eq!(pump.pull(0).frames, 16);
        assert_eq!(pump.pull(1000).frames, 16);
        assert_eq!(pump.pull(5).frames, 5);
        assert_eq!(pump.last_sample(), 37);
    }

    #[test]
    fn test_三声道重排后交错() {
        let mut pump = pump_over(vec![vec![0.0], vec![1.0], vec![2.0]], 1);
        let buf = pump.pull(1);
        assert_eq!(buf.data, &[2.0, 0.0, 1.0]);
    }

    #[test]
    fn test_eof_后进入收尾再终止() {
        let mut pump = pump_over(vec![vec![0.5; 6]], 4);
        assert_eq!(pump.pull(4).frames, 4);
        // 不足一帧, 窗口被标记为最后一个
        assert_eq!(pump.pull(4).frames, 2);
        assert_eq!(pump.state(), PumpState::Running);

        assert!(pump.pull(4).is_empty());
        assert_eq!(pump.state(), PumpState::Draining);
        assert!(pump.pull(4).is_empty());
        assert_eq!(pump.state(), PumpState::Terminal);
        assert!(pump.pull(4).is_empty());
        assert_eq!(pump.last_sample(), 6);
    }

    #[test]
    fn test_链尾无数据直接收尾() {
        let mut pump = pump_over(vec![vec![0.0; 4]], 4);
        pump.skip_samples(4);
        assert!(pump.pull(4).is_empty());
        assert!(pump.is_finishing());
        assert!(!pump.is_terminal());
    }

    #[test]
    fn test_超大跳过后收尾而不溢出() {
        let mut pump = pump_over(vec![vec![0.0; 4]], 4);
        pump.skip_samples(u64::MAX - 10);
        assert_eq!(pump.last_sample(), i64::MAX as u64);
        assert!(pump.pull(1024).is_empty());
        assert_eq!(pump.state(), PumpState::Draining);
        assert!(pump.next_dts(1024) >= 0);
        assert!(pump.next_dts(1024) >= 0);
    }

    /// 声明的采样数多于实际平面长度
    struct ShortPlaneSource {
        info: AudioStreamInfo,
    }

    impl AudioFilter for ShortPlaneSource {
        fn name(&self) -> &str {
            "short-plane"
        }

        fn info(&self) -> &AudioStreamInfo {
            &self.info
        }

        fn fetch_samples(&mut self, start: u64, _end: u64) -> AencResult<Option<SampleWindow>> {
            let mut window = SampleWindow::new(vec![vec![0.0; 10]], start);
            window.sample_count = 20;
            Ok(Some(window))
        }
    }

    #[test]
    fn test_窗口采样数与平面长度不符时收尾() {
        let src = ShortPlaneSource {
            info: AudioStreamInfo::raw_f32(8000, 1),
        };
        let mut pump = FramePump::new(Box::new(src), 1, 1024);
        assert!(pump.pull(1024).is_empty());
        assert_eq!(pump.state(), PumpState::Draining);
        assert_eq!(pump.last_sample(), 0);
        assert!(pump.pull(1024).is_empty());
        assert!(pump.is_terminal());
    }

    #[test]
    fn test_取样出错视为输入结束() {
        let src = FlakySource {
            info: AudioStreamInfo::raw_f32(8000, 1),
            calls: 0,
        };
        let mut pump = FramePump::new(Box::new(src), 1, 8);
        assert_eq!(pump.pull(8).frames, 8);
        assert!(pump.pull(8).is_empty());
        assert_eq!(pump.state(), PumpState::Draining);
    }

    #[test]
    fn test_时间戳从首次取样位置开始() {
        let mut pump = pump_over(vec![vec![0.0; 64]], 16);
        pump.skip_samples(10);
        pump.pull(16);
        assert_eq!(pump.next_dts(16), 10);
        assert_eq!(pump.next_dts(16), 26);
    }

    #[test]
    fn test_收尾后_begin_drain_不回退状态() {
        let mut pump = pump_over(vec![vec![0.0; 4]], 4);
        pump.terminate();
        pump.begin_drain();
        assert!(pump.is_terminal());
    }
}
