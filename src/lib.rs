//! # Vela
//!
//! 纯 Rust 实现的段级视频解码会话.
//!
//! Vela 接收按显示顺序排列的 NAL 单元, 负责:
//! - **段切换**: 段头解码, 版本与位深检查, 当前段/上一段快照
//! - **重排序**: 缓冲图像单元, 尾部图像跨段插入
//! - **图像池**: 滑动窗口大小计算, 槽位回收
//! - **参考列表**: 按时间层与开放/封闭 GOP 策略构建
//! - **输出**: POC 升序, 时间层降采样, 输出格式转换
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use vela::codec::{DecoderConfig, SegmentDecoder};
//!
//! let mut decoder = SegmentDecoder::new(DecoderConfig::default());
//! # let units: Vec<Vec<u8>> = Vec::new();
//! for unit in &units {
//!     decoder.decode_nal(unit);
//!     while let Some(picture) = decoder.get_decoded_picture() {
//!         println!("poc={}", picture.stats.poc);
//!     }
//! }
//! decoder.flush_buffered_tail_pics();
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `vela-core` | 错误类型, 位读写, 色度格式, CRC |
//! | `vela-codec` | 段头, 图像头, 解码会话 |

/// 核心类型与工具
pub use vela_core as core;

/// 段级解码会话
pub use vela_codec as codec;

/// 获取 Vela 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 以默认配置创建解码会话
pub fn default_decoder() -> vela_codec::SegmentDecoder {
    vela_codec::SegmentDecoder::new(vela_codec::DecoderConfig::default())
}
