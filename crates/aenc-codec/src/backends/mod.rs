//! 编码后端实现.
//!
//! 平台编码组件以 [`crate::EncoderBackend`] 接入; 这里只提供进程内的回环后端.

pub mod loopback;

pub use loopback::LoopbackBackend;
