//! 声道重排.
//!
//! 滤镜链的声道顺序为 L R C LFE Ls Rs (Lb Rb), 后端要求 C L R ... LFE 在末尾.
//! 重排规则: `dst[i] = src[map[i]]`.

use aenc_core::{AencError, AencResult};

/// 支持的最大声道数
pub const MAX_CHANNELS: usize = 8;

/// 各声道数对应的重排表 (下标为声道数 - 1)
pub const CHANNEL_MAP: [&[usize]; MAX_CHANNELS] = [
    &[0],
    &[0, 1],
    &[2, 0, 1],
    &[0, 1, 2, 3],
    &[2, 0, 1, 3, 4],
    &[2, 0, 1, 4, 5, 3],
    &[2, 0, 1, 6, 4, 5, 3],
    &[2, 0, 1, 6, 7, 4, 5, 3],
];

/// 获取指定声道数的重排表
pub fn channel_map(channels: usize) -> Option<&'static [usize]> {
    channels
        .checked_sub(1)
        .and_then(|i| CHANNEL_MAP.get(i))
        .copied()
}

/// 按重排表原地置换各声道平面
///
/// 先把所有平面移到临时表, 再按 `map` 取回, 不复制采样数据.
pub fn apply_permutation<T: Default>(planes: &mut [T], map: &[usize]) -> AencResult<()> {
    if planes.len() != map.len() {
        return Err(AencError::InvalidArgument(format!(
            "声道数 {} 与重排表长度 {} 不一致",
            planes.len(),
            map.len()
        )));
    }
    let mut tmp: Vec<T> = planes.iter_mut().map(std::mem::take).collect();
    for (dst, &src) in planes.iter_mut().zip(map) {
        let slot = tmp
            .get_mut(src)
            .ok_or_else(|| AencError::Internal(format!("重排表下标越界: {src}")))?;
        *dst = std::mem::take(slot);
    }
    Ok(())
}

/// 把滤镜链顺序的声道平面重排为后端顺序
pub fn remap_channels<T: Default>(planes: &mut [T]) -> AencResult<()> {
    let map = channel_map(planes.len()).ok_or_else(|| {
        AencError::Config(format!("不支持 {} 声道音频", planes.len()))
    })?;
    apply_permutation(planes, map)
}

/// 求重排表的逆置换
pub fn inverse_map(map: &[usize]) -> Vec<usize> {
    let mut inv = vec![0; map.len()];
    for (i, &m) in map.iter().enumerate() {
        inv[m] = i;
    }
    inv
}
