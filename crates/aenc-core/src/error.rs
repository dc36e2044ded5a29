//! 统一错误类型定义.
//!
//! 所有 aenc crate 共用的错误类型, 支持跨模块传播.
//!
//! 初始化阶段的致命错误分为四类: 配置 (`Config`)、后端协商 (`Negotiation`)、
//! 描述符解析 (`Descriptor`) 和后端调用 (`Backend`). 量化取整、选项警告等
//! 可恢复情况只记录日志, 不会以错误形式返回.

use thiserror::Error;

/// aenc 统一错误类型
#[derive(Debug, Error)]
pub enum AencError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 配置错误 (声道数、采样率组合不受支持等)
    #[error("配置错误: {0}")]
    Config(String),

    /// 与编码后端协商失败
    #[error("后端协商失败: {0}")]
    Negotiation(String),

    /// 编解码器初始化描述符解析失败
    #[error("描述符解析失败: {0}")]
    Descriptor(String),

    /// 编码后端调用失败
    #[error("编码后端错误: {0}")]
    Backend(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 无效数据 (损坏的文件等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 未找到指定的滤镜
    #[error("未找到滤镜: {0}")]
    FilterNotFound(String),

    /// 未找到指定的编码器
    #[error("未找到编码器: {0}")]
    EncoderNotFound(String),

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

/// aenc 统一 Result 类型
pub type AencResult<T> = Result<T, AencError>;
