//! 输入数据包.
//!
//! 一个 Packet 承载一个完整的 NAL 单元. 数据为空的包表示刷新 (flush).

use bytes::Bytes;

/// NAL 单元数据包
#[derive(Debug, Clone, Default)]
pub struct Packet {
    /// NAL 单元字节
    pub data: Bytes,
    /// 在输入流中的字节偏移量 (-1 表示未知)
    pub pos: i64,
}

impl Packet {
    /// 创建空数据包 (flush packet)
    pub fn empty() -> Self {
        Self {
            data: Bytes::new(),
            pos: -1,
        }
    }

    /// 从数据创建数据包
    pub fn from_data(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::empty()
        }
    }

    /// 数据大小 (字节)
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 是否为空包
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
