//! 重排序缓冲.
//!
//! 按到达顺序暂存尚未解码的图像 NAL 单元. 当存在待解码的尾部图像时,
//! 新段的非尾部单元插入到队首, 保证它先于上一段的尾部图像解码.

use std::collections::VecDeque;

use bytes::Bytes;

/// 待解码 NAL 单元队列
#[derive(Debug, Default)]
pub(crate) struct ReorderBuffer {
    units: VecDeque<Bytes>,
}

impl ReorderBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.units.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// 插入位置判定: 有待解码尾部图像时非尾部单元进队首
    pub(crate) fn inserts_at_front(buffer_flag: bool, pending_tails: usize) -> bool {
        pending_tails > 0 && !buffer_flag
    }

    /// 按插入规则入队
    pub(crate) fn push(&mut self, unit: Bytes, buffer_flag: bool, pending_tails: usize) {
        if Self::inserts_at_front(buffer_flag, pending_tails) {
            self.units.push_front(unit);
        } else {
            self.units.push_back(unit);
        }
    }

    /// 取出队首单元
    pub(crate) fn pop_front(&mut self) -> Option<Bytes> {
        self.units.pop_front()
    }

    /// 丢弃全部单元, 返回丢弃数量
    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.units.len();
        self.units.clear();
        dropped
    }

    /// 按队列顺序取出全部单元
    pub(crate) fn drain_all(&mut self) -> Vec<Bytes> {
        self.units.drain(..).collect()
    }
}
