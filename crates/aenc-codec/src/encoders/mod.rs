//! 编码器适配器实现.

pub mod aac;
