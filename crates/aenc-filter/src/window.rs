//! 采样窗口 (SampleWindow).
//!
//! 滤镜链一次取样的结果: 平面 32 位浮点采样, 每声道一个 `Vec<f32>`.
//! 窗口只在一次拉取周期内有效, 下一次拉取时被新窗口取代.

use bitflags::bitflags;

bitflags! {
    /// 采样窗口标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WindowFlags: u32 {
        /// 该窗口是流中的最后一个窗口
        const EOF = 1 << 0;
    }
}

/// 采样窗口
#[derive(Debug, Clone, Default)]
pub struct SampleWindow {
    /// 平面采样数据, 每声道一个 Vec
    pub samples: Vec<Vec<f32>>,
    /// 每声道采样数
    pub sample_count: usize,
    /// 窗口起始采样位置 (相对流起点)
    pub start: u64,
    /// 标志位
    pub flags: WindowFlags,
}

impl SampleWindow {
    /// 由平面数据创建窗口, 采样数取各声道长度的最小值
    pub fn new(samples: Vec<Vec<f32>>, start: u64) -> Self {
        let sample_count = samples.iter().map(Vec::len).min().unwrap_or(0);
        Self {
            samples,
            sample_count,
            start,
            flags: WindowFlags::empty(),
        }
    }

    /// 从完整的平面数据中截取 `[start, end)`
    ///
    /// 起点已超出数据末尾时返回 `None`; 截取范围触及末尾时窗口带 EOF 标志.
    pub fn from_planes(planes: &[Vec<f32>], start: u64, end: u64) -> Option<Self> {
        let total = planes.iter().map(Vec::len).min().unwrap_or(0) as u64;
        if start >= total || end <= start {
            return None;
        }
        let end = end.min(total);
        let (s, e) = (start as usize, end as usize);
        let mut window = Self::new(planes.iter().map(|p| p[s..e].to_vec()).collect(), start);
        if end == total {
            window.flags |= WindowFlags::EOF;
        }
        Some(window)
    }

    /// 声道数
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// 是否为最后一个窗口
    pub fn is_eof(&self) -> bool {
        self.flags.contains(WindowFlags::EOF)
    }

    /// 标记为最后一个窗口
    pub fn mark_eof(&mut self) {
        self.flags |= WindowFlags::EOF;
    }

    /// 将平面数据交错写入 `out` (先清空 `out`)
    ///
    /// 只写出各声道都有的采样, `sample_count` 超出平面长度的部分被忽略.
    pub fn interleave_into(&self, out: &mut Vec<f32>) {
        out.clear();
        let count = self
            .samples
            .iter()
            .map(Vec::len)
            .min()
            .map_or(0, |len| len.min(self.sample_count));
        out.reserve(count * self.channels());
        for i in 0..count {
            for plane in &self.samples {
                out.push(plane[i]);
            }
        }
    }
}
