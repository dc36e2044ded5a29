//! 参数量化.
//!
//! 把用户请求的码率/VBR 质量对齐到后端接受的离散值: 先钳位到可接受范围,
//! 再取最近的合法值. 两个候选值的中点 `(a + b) >> 1` 归属较大的一侧.

use aenc_core::{AencError, AencResult};
use log::warn;

use crate::codec_config::VBR_QUALITY_VALUES;

/// 后端合法值表的最大长度
pub const MAX_LEGAL_VALUES: usize = 64;

/// 量化结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantized {
    /// 在合法值表中的下标
    pub index: usize,
    /// 对应的值
    pub value: i32,
}

/// 在升序表中查找最接近 `value` 的下标
///
/// 每个下标占据以相邻中点划分的半开区间; 表为空时返回 `None`.
pub fn find_nearest_index(value: i32, values: &[i32]) -> Option<usize> {
    let (&first, &last) = (values.first()?, values.last()?);
    if value <= first {
        return Some(0);
    }
    if value >= last {
        return Some(values.len() - 1);
    }
    for (i, pair) in values.windows(2).enumerate() {
        let center = (i64::from(pair[0]) + i64::from(pair[1])) >> 1;
        let v = i64::from(value);
        if i64::from(pair[0]) <= v && v < center {
            return Some(i);
        }
        if center <= v && v < i64::from(pair[1]) {
            return Some(i + 1);
        }
    }
    None
}

/// 检查后端返回的合法值表
///
/// 表不能为空, 长度不超过 [`MAX_LEGAL_VALUES`], 且必须升序.
pub fn check_legal_values(values: &[i32], what: &str) -> AencResult<()> {
    if values.is_empty() {
        return Err(AencError::Negotiation(format!("{what}: 合法值表为空")));
    }
    if values.len() > MAX_LEGAL_VALUES {
        return Err(AencError::Negotiation(format!(
            "{what}: 合法值表过长 ({} > {MAX_LEGAL_VALUES})",
            values.len()
        )));
    }
    if values.windows(2).any(|w| w[0] > w[1]) {
        return Err(AencError::Negotiation(format!("{what}: 合法值表不是升序")));
    }
    Ok(())
}

/// 量化码率 (kbps)
///
/// 先钳位到 `limited` 表的首尾, 再在 `available` 表中取最近值.
pub fn quantize_bitrate(desired: i32, limited: &[i32], available: &[i32]) -> AencResult<Quantized> {
    check_legal_values(limited, "limited 码率")?;
    check_legal_values(available, "available 码率")?;

    let lo = limited[0];
    let hi = limited[limited.len() - 1];
    let clamped = desired.clamp(lo, hi);
    let index = find_nearest_index(clamped, available)
        .ok_or_else(|| AencError::Internal(format!("码率 {clamped} 不在任何区间内")))?;
    let value = available[index];
    if value != desired {
        warn!("码率 {desired}kbps 已取整到最近的可用值 {value}kbps");
    }
    Ok(Quantized { index, value })
}

/// 量化 VBR 质量 (0-127)
pub fn quantize_vbr_quality(desired: i32) -> Quantized {
    let clamped = desired.clamp(0, 127);
    // 阶梯覆盖 0..=127, 查找必然成功
    let index = find_nearest_index(clamped, &VBR_QUALITY_VALUES).unwrap_or(0);
    let value = VBR_QUALITY_VALUES[index];
    if value != desired {
        warn!("VBR 质量 {desired} 已取整到最近的可用值 {value}");
    }
    Quantized { index, value }
}
