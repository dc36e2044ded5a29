//! MPEG-4 esds 描述符序列.
//!
//! 后端以 magic cookie 的形式给出一段 esds 描述符序列, 其中 DecoderSpecificInfo
//! (tag 0x05) 的内容就是 AudioSpecificConfig. 这里按扁平方式顺序走查:
//!
//! ```text
//! tag(1) + length(1-4, 每字节高位为续标志, 低 7 位为值) + payload
//!
//! 0x03 ES_Descriptor          跳过 ES_ID(2) + flags(1), 子描述符紧随其后
//! 0x04 DecoderConfigDescriptor 跳过 objectType(1) + streamType(1) + bufferSize(3)
//!                                  + maxBitrate(4) + avgBitrate(4)
//! 0x05 DecoderSpecificInfo     payload 即 AudioSpecificConfig
//! 其他                         整体跳过
//! ```
//!
//! 所有读取都做边界检查. 尚未找到 0x05 时遇到截断记录返回错误;
//! 已找到之后的截断只记警告.

use std::ops::Range;

use aenc_core::{AencError, AencResult};
use log::warn;

/// ES_Descriptor
pub const TAG_ES_DESCRIPTOR: u8 = 0x03;
/// DecoderConfigDescriptor
pub const TAG_DECODER_CONFIG: u8 = 0x04;
/// DecoderSpecificInfo
pub const TAG_DECODER_SPECIFIC_INFO: u8 = 0x05;
/// SLConfigDescriptor
pub const TAG_SL_CONFIG: u8 = 0x06;

/// ES_Descriptor 中要跳过的固定字节数
const ES_DESCRIPTOR_FIXED_LEN: usize = 3;
/// DecoderConfigDescriptor 中要跳过的固定字节数
const DECODER_CONFIG_FIXED_LEN: usize = 13;
/// 描述符长度字段最多占用的字节数
const MAX_LENGTH_BYTES: usize = 4;

/// 带边界检查的字节游标
struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> AencResult<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| AencError::Descriptor(format!("偏移 {} 处数据截断", self.pos)))?;
        self.pos += 1;
        Ok(b)
    }

    fn skip(&mut self, n: usize) -> AencResult<()> {
        if n > self.remaining() {
            return Err(AencError::Descriptor(format!(
                "偏移 {} 处需要跳过 {n} 字节, 仅剩 {} 字节",
                self.pos,
                self.remaining()
            )));
        }
        self.pos += n;
        Ok(())
    }

    /// 读取可变长度字段
    fn read_length(&mut self) -> AencResult<usize> {
        let mut len = 0usize;
        for _ in 0..MAX_LENGTH_BYTES {
            let b = self.read_u8()?;
            len = (len << 7) | usize::from(b & 0x7F);
            if b & 0x80 == 0 {
                return Ok(len);
            }
        }
        Err(AencError::Descriptor(format!(
            "描述符长度字段超过 {MAX_LENGTH_BYTES} 字节"
        )))
    }
}

/// 走查一条描述符记录, 遇到 0x05 时更新 `found`
fn walk_record(cur: &mut ByteCursor<'_>, found: &mut Option<Range<usize>>) -> AencResult<()> {
    let tag = cur.read_u8()?;
    let len = cur.read_length()?;
    match tag {
        TAG_ES_DESCRIPTOR => cur.skip(ES_DESCRIPTOR_FIXED_LEN),
        TAG_DECODER_CONFIG => cur.skip(DECODER_CONFIG_FIXED_LEN),
        TAG_DECODER_SPECIFIC_INFO => {
            let start = cur.pos;
            cur.skip(len)?;
            *found = Some(start..start + len);
            Ok(())
        }
        _ => cur.skip(len),
    }
}

/// 在描述符序列中定位 AudioSpecificConfig 的字节范围
pub fn locate_audio_specific_config(buf: &[u8]) -> AencResult<Range<usize>> {
    let mut cur = ByteCursor::new(buf);
    let mut found: Option<Range<usize>> = None;

    while cur.remaining() > 0 {
        if let Err(e) = walk_record(&mut cur, &mut found) {
            if found.is_some() {
                warn!("esds: AudioSpecificConfig 之后的描述符不完整: {e}");
                break;
            }
            return Err(e);
        }
    }

    match found {
        Some(range) if !range.is_empty() => Ok(range),
        Some(_) => Err(AencError::Descriptor("AudioSpecificConfig 长度为 0".into())),
        None => Err(AencError::Descriptor("未找到 DecoderSpecificInfo (0x05)".into())),
    }
}

/// 取出 AudioSpecificConfig
pub fn read_audio_specific_config(buf: &[u8]) -> AencResult<&[u8]> {
    let range = locate_audio_specific_config(buf)?;
    Ok(&buf[range])
}

/// 写入描述符长度字段 (固定 4 字节形式)
pub fn write_descriptor_length(buf: &mut Vec<u8>, len: usize) {
    buf.push(0x80 | ((len >> 21) as u8 & 0x7F));
    buf.push(0x80 | ((len >> 14) as u8 & 0x7F));
    buf.push(0x80 | ((len >> 7) as u8 & 0x7F));
    buf.push((len & 0x7F) as u8);
}

/// 写入一条完整描述符
pub fn write_descriptor(buf: &mut Vec<u8>, tag: u8, payload: &[u8]) {
    buf.push(tag);
    write_descriptor_length(buf, payload.len());
    buf.extend_from_slice(payload);
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASC: [u8; 2] = [0x12, 0x10];

    /// 嵌套写法: 0x03 { fixed, 0x04 { fixed, 0x05 { asc } }, 0x06 { 0x02 } }
    fn nested_esds(asc: &[u8]) -> Vec<u8> {
        let mut dsi = Vec::new();
        write_descriptor(&mut dsi, TAG_DECODER_SPECIFIC_INFO, asc);

        let mut dcd_payload = vec![0x40, 0x15, 0, 0, 0, 0, 1, 0xF4, 0, 0, 1, 0xF4, 0];
        dcd_payload.extend_from_slice(&dsi);
        let mut es_payload = vec![0x00, 0x01, 0x00];
        write_descriptor(&mut es_payload, TAG_DECODER_CONFIG, &dcd_payload);
        write_descriptor(&mut es_payload, TAG_SL_CONFIG, &[0x02]);

        let mut out = Vec::new();
        write_descriptor(&mut out, TAG_ES_DESCRIPTOR, &es_payload);
        out
    }

    #[test]
    fn test_嵌套描述符中定位_asc() {
        let esds = nested_esds(&ASC);
        let range = locate_audio_specific_config(&esds).unwrap();
        assert_eq!(&esds[range.clone()], &ASC);
        assert_eq!(read_audio_specific_config(&esds).unwrap(), &ASC);
        // tag(1)+len(4)+3 + tag(1)+len(4)+13 + tag(1)+len(4)
        assert_eq!(range.start, 31);
    }

    #[test]
    fn test_单字节长度() {
        let esds = [0x05, 0x02, 0x11, 0x90];
        assert_eq!(locate_audio_specific_config(&esds).unwrap(), 2..4);
    }

    #[test]
    fn test_跳过未知描述符() {
        let esds = [0x7F, 0x03, 0xAA, 0xBB, 0xCC, 0x05, 0x01, 0x13];
        assert_eq!(read_audio_specific_config(&esds).unwrap(), &[0x13]);
    }

    #[test]
    fn test_找到_asc_前截断返回错误() {
        let esds = nested_esds(&ASC);
        for cut in [1, 4, 10, 20, 32] {
            assert!(
                matches!(
                    locate_audio_specific_config(&esds[..cut]),
                    Err(AencError::Descriptor(_))
                ),
                "cut={cut}"
            );
        }
    }

    #[test]
    fn test_找到_asc_后截断只告警() {
        let esds = nested_esds(&ASC);
        // 截掉 SLConfig 的最后一个字节
        let truncated = &esds[..esds.len() - 1];
        assert_eq!(read_audio_specific_config(truncated).unwrap(), &ASC);
    }

    #[test]
    fn test_长度字段超过四字节() {
        let esds = [0x05, 0x80, 0x80, 0x80, 0x80, 0x01, 0x00];
        assert!(matches!(
            locate_audio_specific_config(&esds),
            Err(AencError::Descriptor(_))
        ));
    }

    #[test]
    fn test_缺少_0x05() {
        let esds = [0x06, 0x01, 0x02];
        assert!(locate_audio_specific_config(&esds).is_err());
        assert!(locate_audio_specific_config(&[]).is_err());
        assert!(locate_audio_specific_config(&[0x05, 0x00]).is_err());
    }
}
