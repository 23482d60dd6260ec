//! # vela-core
//!
//! Vela 解码框架核心库, 提供基础类型定义、错误处理和位级读写工具.
//!
//! 解码会话 (`vela-codec`) 和命令行工具 (`vela-dec`) 共用本 crate 的类型.

pub mod bitreader;
pub mod bitwriter;
pub mod chroma_format;
pub mod color;
pub mod crc;
pub mod error;

// 重导出常用类型
pub use chroma_format::ChromaFormat;
pub use color::ColorMatrix;
pub use error::{VelaError, VelaResult};
