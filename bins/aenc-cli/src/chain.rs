//! 滤镜链构建.

use anyhow::{Context, Result};

use aenc_filter::{AudioFilter, AudioFilterId, FilterRegistry};

/// WAV 文件源, 可选接一级音量
pub fn wav_chain(
    registry: &FilterRegistry,
    path: &str,
    volume_db: Option<f64>,
) -> Result<Box<dyn AudioFilter>> {
    // 选项串以 ':' 分隔, 路径中的 ':' 需要转义
    let opts = format!("filename={}", path.replace(':', "\\:"));
    let source = registry
        .create(AudioFilterId::Wav, None, &opts)
        .with_context(|| format!("打开输入文件失败, path={path}"))?;
    with_volume(registry, source, volume_db)
}

/// 正弦波源, 可选接一级音量
pub fn tone_chain(
    registry: &FilterRegistry,
    opts: &str,
    volume_db: Option<f64>,
) -> Result<Box<dyn AudioFilter>> {
    let source = registry
        .create(AudioFilterId::Tone, None, opts)
        .with_context(|| format!("创建正弦波源失败, options={opts}"))?;
    with_volume(registry, source, volume_db)
}

fn with_volume(
    registry: &FilterRegistry,
    source: Box<dyn AudioFilter>,
    volume_db: Option<f64>,
) -> Result<Box<dyn AudioFilter>> {
    let Some(db) = volume_db else {
        return Ok(source);
    };
    log::debug!("滤镜链: {} -> volume({db}dB)", source.name());
    registry
        .create(AudioFilterId::Volume, Some(source), &format!("db={db}"))
        .context("创建音量滤镜失败")
}
