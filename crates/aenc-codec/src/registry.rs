//! 编码器注册表.
//!
//! 与滤镜注册表相同, 按 [`EncoderId`] 直接索引, 注册时断言顺序.
//! 工厂函数除链尾和选项串外还接收一个编码后端实例.

use std::fmt;

use aenc_core::{AencError, AencResult};
use aenc_filter::AudioFilter;

use crate::backend::EncoderBackend;
use crate::encoder::AudioEncoder;

/// 内置编码器标识
///
/// 判别值即注册表中的下标.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum EncoderId {
    /// AAC-LC
    Aac = 0,
    /// HE-AAC
    AacHe = 1,
}

impl EncoderId {
    /// 全部标识, 按声明顺序
    pub const ALL: [Self; 2] = [Self::Aac, Self::AacHe];

    /// 注册表下标
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EncoderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Aac => "aac",
            Self::AacHe => "aac_he",
        };
        write!(f, "{name}")
    }
}

/// 编码器工厂函数类型
pub type EncoderFactory = fn(
    Box<dyn AudioFilter>,
    &str,
    Box<dyn EncoderBackend>,
) -> AencResult<Box<dyn AudioEncoder>>;

/// 编码器注册条目
struct EncoderEntry {
    /// 标识
    id: EncoderId,
    /// 编码器名称
    name: String,
    /// 工厂函数
    factory: EncoderFactory,
}

/// 编码器注册表
pub struct EncoderRegistry {
    /// 按标识判别值排列的条目
    entries: Vec<EncoderEntry>,
}

impl EncoderRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(EncoderId::ALL.len()),
        }
    }

    /// 注册一个编码器
    ///
    /// # Panics
    /// 注册顺序与 [`EncoderId`] 声明顺序不一致时触发断言.
    pub fn register(&mut self, id: EncoderId, name: impl Into<String>, factory: EncoderFactory) {
        assert_eq!(
            self.entries.len(),
            id.index(),
            "编码器 {id} 的注册顺序与 EncoderId 声明顺序不一致"
        );
        self.entries.push(EncoderEntry {
            id,
            name: name.into(),
            factory,
        });
    }

    /// 按名称查找标识
    pub fn find(&self, name: &str) -> Option<EncoderId> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.id)
    }

    /// 创建指定标识的编码器实例
    pub fn create(
        &self,
        id: EncoderId,
        chain: Box<dyn AudioFilter>,
        opt_str: &str,
        backend: Box<dyn EncoderBackend>,
    ) -> AencResult<Box<dyn AudioEncoder>> {
        let entry = self
            .entries
            .get(id.index())
            .ok_or_else(|| AencError::EncoderNotFound(format!("编码器 {id} 未注册")))?;
        (entry.factory)(chain, opt_str, backend)
    }

    /// 按名称创建编码器实例
    pub fn create_by_name(
        &self,
        name: &str,
        chain: Box<dyn AudioFilter>,
        opt_str: &str,
        backend: Box<dyn EncoderBackend>,
    ) -> AencResult<Box<dyn AudioEncoder>> {
        let id = self
            .find(name)
            .ok_or_else(|| AencError::EncoderNotFound(name.to_string()))?;
        self.create(id, chain, opt_str, backend)
    }

    /// 获取所有已注册的编码器 (按注册顺序)
    pub fn list(&self) -> Vec<(EncoderId, &str)> {
        self.entries
            .iter()
            .map(|e| (e.id, e.name.as_str()))
            .collect()
    }
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
