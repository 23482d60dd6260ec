//! 参考图像列表构建.
//!
//! 候选参考为池中已解码的其他图像, 需满足时间层约束:
//! 参考图像的 tid 必须小于当前图像, tid 0 图像之间可以互相参考.
//! 封闭 GOP 策略下还要求与当前图像处于同一段.
//!
//! L0 为 POC 小于当前图像的候选 (按 POC 降序), L1 为 POC 大于当前图像的
//! 候选 (按 POC 升序), 两者都截断到段头的参考数上限.

use log::trace;

use crate::picture::{PictureDecoder, RefEntry, ReferencePictureLists};

/// 参考列表构建器
#[derive(Debug, Clone, Copy)]
pub struct ReferenceListSorter {
    open_gop: bool,
    num_ref_pics: usize,
}

impl ReferenceListSorter {
    /// `open_gop` 取上一段的 GOP 策略, `num_ref_pics` 取当前图像所属段的参考数
    pub fn new(open_gop: bool, num_ref_pics: usize) -> Self {
        Self {
            open_gop,
            num_ref_pics,
        }
    }

    /// 为 `slots[target]` 构建参考列表
    pub fn prepare_ref_pic_lists(
        &self,
        target: usize,
        slots: &[PictureDecoder],
    ) -> ReferencePictureLists {
        let Some(current) = slots.get(target).map(PictureDecoder::pic_data) else {
            return ReferencePictureLists::default();
        };
        if current.is_intra() || self.num_ref_pics == 0 {
            return ReferencePictureLists::default();
        }

        let candidates = slots.iter().enumerate().filter_map(|(slot, pic)| {
            let data = pic.pic_data();
            if slot == target || !data.decoded {
                return None;
            }
            let tid_ok = data.tid < current.tid || data.tid == 0;
            let segment_ok = self.open_gop || data.soc == current.soc;
            (tid_ok && segment_ok).then_some(RefEntry {
                slot,
                poc: data.poc,
            })
        });

        let mut before = Vec::new();
        let mut after = Vec::new();
        for entry in candidates {
            if entry.poc < current.poc {
                before.push(entry);
            } else if entry.poc > current.poc {
                after.push(entry);
            }
        }
        // L0: 离当前图像最近的过去图像在前
        before.sort_by(|a, b| b.poc.cmp(&a.poc));
        after.sort_by_key(|entry| entry.poc);
        before.truncate(self.num_ref_pics);
        after.truncate(self.num_ref_pics);

        trace!(
            "参考列表: poc={}, L0={:?}, L1={:?}",
            current.poc,
            before.iter().map(|e| e.poc).collect::<Vec<_>>(),
            after.iter().map(|e| e.poc).collect::<Vec<_>>(),
        );
        ReferencePictureLists::new(before, after)
    }
}
