//! 时间基.
//!
//! 编码输出的时间基固定为 `1/采样率`, 每个 tick 对应一个采样.

use std::fmt;

/// 有理数时间基 `num/den`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// 采样时钟时间基 `1/sample_rate`
    ///
    /// 采样率超出 `i32` 范围时分母为 0, 即无效时间基.
    pub fn from_sample_rate(sample_rate: u32) -> Self {
        Self::new(1, i32::try_from(sample_rate).unwrap_or(0))
    }

    /// 分母不为 0
    pub const fn is_valid(&self) -> bool {
        self.den != 0
    }

    /// 无效时间基返回 `NaN`
    pub fn to_f64(self) -> f64 {
        if !self.is_valid() {
            return f64::NAN;
        }
        f64::from(self.num) / f64::from(self.den)
    }

    /// 把以本时间基计的 tick 数换算为秒
    pub fn ticks_to_seconds(self, ticks: i64) -> f64 {
        ticks as f64 * self.to_f64()
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
