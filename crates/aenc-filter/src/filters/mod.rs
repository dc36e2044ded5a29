//! 内置滤镜实现模块.

pub mod buffer;
pub mod tone;
pub mod volume;
pub mod wav;
