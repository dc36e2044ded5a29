//! WAV (RIFF WAVE) 文件源.
//!
//! 打开时将整个 data 块解码为平面浮点, 之后按区间取样.
//!
//! WAV 文件结构:
//! ```text
//! RIFF header:  "RIFF" + file_size-8 + "WAVE"
//! fmt  chunk:   "fmt " + chunk_size + audio_format + channels + sample_rate
//!              + byte_rate + block_align + bits_per_sample
//! data chunk:   "data" + data_size + PCM samples...
//! ```
//!
//! 选项: `filename`.

use std::io::{Cursor, Read};
use std::path::Path;

use aenc_core::{AencError, AencResult, AudioStreamInfo, SampleFormat, SplitOptions};
use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, warn};

use crate::{AudioFilter, SampleWindow};

/// WAV 整数 PCM 格式码
const WAV_FORMAT_PCM: u16 = 0x0001;
/// WAV IEEE 浮点格式码
const WAV_FORMAT_IEEE_FLOAT: u16 = 0x0003;
/// WAVE_FORMAT_EXTENSIBLE, 实际格式码在子格式 GUID 的前两个字节
const WAV_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// 识别的选项名
const WAV_OPTIONS: &[&str] = &["filename"];

/// fmt 块内容
#[derive(Debug, Clone, Copy)]
struct WavFormat {
    audio_format: u16,
    channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

/// WAV 文件源
pub struct WavSource {
    /// 流信息
    info: AudioStreamInfo,
    /// 文件中的原始采样格式
    source_format: SampleFormat,
    /// 平面采样数据
    planes: Vec<Vec<f32>>,
}

impl WavSource {
    /// 打开 WAV 文件
    pub fn open(path: impl AsRef<Path>) -> AencResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        debug!("wav: 读取 {} ({} 字节)", path.display(), data.len());
        Self::from_bytes(&data)
    }

    /// 从内存中的完整 WAV 数据创建
    pub fn from_bytes(data: &[u8]) -> AencResult<Self> {
        let mut cur = Cursor::new(data);

        let mut tag = [0u8; 4];
        cur.read_exact(&mut tag)?;
        if &tag != b"RIFF" {
            return Err(AencError::InvalidData("不是有效的 RIFF 文件".into()));
        }
        let _file_size = cur.read_u32::<LittleEndian>()?;
        cur.read_exact(&mut tag)?;
        if &tag != b"WAVE" {
            return Err(AencError::InvalidData("不是有效的 WAVE 文件".into()));
        }

        let mut format: Option<WavFormat> = None;
        let mut payload: Option<&[u8]> = None;

        while payload.is_none() {
            if cur.read_exact(&mut tag).is_err() {
                break;
            }
            let chunk_size = cur.read_u32::<LittleEndian>()? as usize;
            let chunk_start = cur.position() as usize;
            let chunk_end = chunk_start.saturating_add(chunk_size);

            match &tag {
                b"fmt " => format = Some(Self::parse_fmt(&mut cur, chunk_size)?),
                b"data" => {
                    let end = if chunk_end > data.len() {
                        warn!("wav: data 块声明长度超出文件, 按实际长度截断");
                        data.len()
                    } else {
                        chunk_end
                    };
                    payload = Some(&data[chunk_start..end]);
                }
                other => {
                    debug!("wav: 跳过块 {:?}", String::from_utf8_lossy(other));
                }
            }
            // chunk 按偶数字节对齐
            cur.set_position((chunk_end + (chunk_size & 1)) as u64);
        }

        let format = format.ok_or_else(|| AencError::InvalidData("缺少 fmt 块".into()))?;
        let payload = payload.ok_or_else(|| AencError::InvalidData("缺少 data 块".into()))?;
        let source_format = Self::resolve_sample_format(format.audio_format, format.bits_per_sample)?;

        let channels = usize::from(format.channels);
        let bytes_per_sample = source_format.bytes_per_sample() as usize;
        if channels == 0 || format.sample_rate == 0 {
            return Err(AencError::InvalidData("fmt 块中的声道数或采样率为 0".into()));
        }
        let block_align = usize::from(format.block_align).max(channels * bytes_per_sample);

        let frames = payload.len() / block_align;
        let mut planes = vec![Vec::with_capacity(frames); channels];
        for block in payload.chunks_exact(block_align) {
            for (ch, plane) in planes.iter_mut().enumerate() {
                let off = ch * bytes_per_sample;
                plane.push(source_format.decode_le(&block[off..off + bytes_per_sample]));
            }
        }

        debug!(
            "wav: {}Hz, {}ch, {}, {} 采样",
            format.sample_rate, channels, source_format, frames
        );

        Ok(Self {
            info: AudioStreamInfo::raw_f32(format.sample_rate, channels as u32),
            source_format,
            planes,
        })
    }

    /// 工厂函数 (注册表使用)
    pub fn create(
        prev: Option<Box<dyn AudioFilter>>,
        opt_str: &str,
    ) -> AencResult<Box<dyn AudioFilter>> {
        if prev.is_some() {
            return Err(AencError::InvalidArgument("wav 是源滤镜, 不能接在其他滤镜之后".into()));
        }
        let opts = SplitOptions::parse(opt_str, WAV_OPTIONS);
        let filename = opts
            .get("filename")
            .ok_or_else(|| AencError::InvalidArgument("wav: 缺少 filename 选项".into()))?;
        Ok(Box::new(Self::open(filename)?))
    }

    /// 文件中的原始采样格式
    pub fn source_format(&self) -> SampleFormat {
        self.source_format
    }

    /// 每声道总采样数
    pub fn total_samples(&self) -> usize {
        self.planes.first().map_or(0, Vec::len)
    }

    fn parse_fmt(cur: &mut Cursor<&[u8]>, chunk_size: usize) -> AencResult<WavFormat> {
        if chunk_size < 16 {
            return Err(AencError::InvalidData(format!("fmt 块过短: {chunk_size} 字节")));
        }
        let mut fmt = WavFormat {
            audio_format: cur.read_u16::<LittleEndian>()?,
            channels: cur.read_u16::<LittleEndian>()?,
            sample_rate: cur.read_u32::<LittleEndian>()?,
            block_align: 0,
            bits_per_sample: 0,
        };
        let _byte_rate = cur.read_u32::<LittleEndian>()?;
        fmt.block_align = cur.read_u16::<LittleEndian>()?;
        fmt.bits_per_sample = cur.read_u16::<LittleEndian>()?;

        if fmt.audio_format == WAV_FORMAT_EXTENSIBLE && chunk_size >= 40 {
            // cbSize(2) + validBits(2) + channelMask(4) + SubFormat GUID(16)
            let _cb_size = cur.read_u16::<LittleEndian>()?;
            let _valid_bits = cur.read_u16::<LittleEndian>()?;
            let _channel_mask = cur.read_u32::<LittleEndian>()?;
            fmt.audio_format = cur.read_u16::<LittleEndian>()?;
        }
        Ok(fmt)
    }

    /// 根据 WAV 格式码和位深确定采样格式
    fn resolve_sample_format(audio_format: u16, bits_per_sample: u16) -> AencResult<SampleFormat> {
        match (audio_format, bits_per_sample) {
            (WAV_FORMAT_PCM, 8) => Ok(SampleFormat::U8),
            (WAV_FORMAT_PCM, 16) => Ok(SampleFormat::S16),
            (WAV_FORMAT_PCM, 24) => Ok(SampleFormat::S24),
            (WAV_FORMAT_PCM, 32) => Ok(SampleFormat::S32),
            (WAV_FORMAT_IEEE_FLOAT, 32) => Ok(SampleFormat::F32),
            (WAV_FORMAT_PCM | WAV_FORMAT_IEEE_FLOAT, bits) => Err(AencError::Unsupported(
                format!("不支持的 WAV 位深: {bits}"),
            )),
            (fmt, _) => Err(AencError::Unsupported(format!(
                "不支持的 WAV 格式码: 0x{fmt:04X}"
            ))),
        }
    }
}

impl AudioFilter for WavSource {
    fn name(&self) -> &str {
        "wav"
    }

    fn info(&self) -> &AudioStreamInfo {
        &self.info
    }

    fn fetch_samples(&mut self, start: u64, end: u64) -> AencResult<Option<SampleWindow>> {
        Ok(SampleWindow::from_planes(&self.planes, start, end))
    }
}
