//! 滤镜注册表.
//!
//! 注册表是一个按 [`AudioFilterId`] 直接索引的有序列表, 在进程启动时构造一次,
//! 通过引用传给需要创建滤镜的代码.

use std::fmt;

use aenc_core::{AencError, AencResult};

use crate::AudioFilter;

/// 内置滤镜标识
///
/// 判别值即注册表中的下标, 注册顺序必须与声明顺序一致.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum AudioFilterId {
    /// 正弦波源
    Tone = 0,
    /// WAV 文件源
    Wav = 1,
    /// 音量
    Volume = 2,
}

impl AudioFilterId {
    /// 全部标识, 按声明顺序
    pub const ALL: [Self; 3] = [Self::Tone, Self::Wav, Self::Volume];

    /// 注册表下标
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for AudioFilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tone => "tone",
            Self::Wav => "wav",
            Self::Volume => "volume",
        };
        write!(f, "{name}")
    }
}

/// 滤镜工厂函数类型
///
/// 参数为上一级滤镜 (源滤镜为 `None`) 和选项串.
pub type FilterFactory =
    fn(Option<Box<dyn AudioFilter>>, &str) -> AencResult<Box<dyn AudioFilter>>;

/// 滤镜注册条目
struct FilterEntry {
    /// 标识
    id: AudioFilterId,
    /// 滤镜名称
    name: String,
    /// 工厂函数
    factory: FilterFactory,
}

/// 滤镜注册表
pub struct FilterRegistry {
    /// 按标识判别值排列的条目
    entries: Vec<FilterEntry>,
}

impl FilterRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(AudioFilterId::ALL.len()),
        }
    }

    /// 注册一个滤镜
    ///
    /// # Panics
    /// 注册顺序与 [`AudioFilterId`] 声明顺序不一致时触发断言.
    pub fn register(&mut self, id: AudioFilterId, name: impl Into<String>, factory: FilterFactory) {
        assert_eq!(
            self.entries.len(),
            id.index(),
            "滤镜 {id} 的注册顺序与 AudioFilterId 声明顺序不一致"
        );
        self.entries.push(FilterEntry {
            id,
            name: name.into(),
            factory,
        });
    }

    /// 按名称查找标识
    pub fn find(&self, name: &str) -> Option<AudioFilterId> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.id)
    }

    /// 创建指定标识的滤镜实例
    pub fn create(
        &self,
        id: AudioFilterId,
        prev: Option<Box<dyn AudioFilter>>,
        opt_str: &str,
    ) -> AencResult<Box<dyn AudioFilter>> {
        let entry = self
            .entries
            .get(id.index())
            .ok_or_else(|| AencError::FilterNotFound(format!("滤镜 {id} 未注册")))?;
        (entry.factory)(prev, opt_str)
    }

    /// 按名称创建滤镜实例
    pub fn create_by_name(
        &self,
        name: &str,
        prev: Option<Box<dyn AudioFilter>>,
        opt_str: &str,
    ) -> AencResult<Box<dyn AudioFilter>> {
        let id = self
            .find(name)
            .ok_or_else(|| AencError::FilterNotFound(name.to_string()))?;
        self.create(id, prev, opt_str)
    }

    /// 获取所有已注册的滤镜 (按注册顺序)
    pub fn list(&self) -> Vec<(AudioFilterId, &str)> {
        self.entries
            .iter()
            .map(|e| (e.id, e.name.as_str()))
            .collect()
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_注册所有滤镜() {
        let mut registry = FilterRegistry::new();
        crate::register_all(&mut registry);

        let list = registry.list();
        assert_eq!(list.len(), AudioFilterId::ALL.len());
        for (i, (id, name)) in list.iter().enumerate() {
            assert_eq!(id.index(), i);
            assert_eq!(*name, id.to_string());
        }
    }

    #[test]
    fn test_按名称查找() {
        let mut registry = FilterRegistry::new();
        crate::register_all(&mut registry);
        assert_eq!(registry.find("volume"), Some(AudioFilterId::Volume));
        assert_eq!(registry.find("lavf"), None);
        assert!(matches!(
            registry.create_by_name("lavf", None, ""),
            Err(AencError::FilterNotFound(_))
        ));
    }

    #[test]
    fn test_未注册的滤镜返回错误() {
        let registry = FilterRegistry::new();
        assert!(matches!(
            registry.create(AudioFilterId::Tone, None, ""),
            Err(AencError::FilterNotFound(_))
        ));
    }

    #[test]
    #[should_panic(expected = "注册顺序")]
    fn test_注册顺序不一致触发断言() {
        let mut registry = FilterRegistry::new();
        registry.register(
            AudioFilterId::Volume,
            "volume",
            crate::VolumeFilter::create,
        );
    }
}
