//! 图像池.
//!
//! 槽位数组, 每个槽位持有一个 [`PictureDecoder`]. 池未达到目标大小时追加新槽位,
//! 否则按以下顺序回收:
//! 1. 第一个已输出且 tid > 0 (或已被丢弃) 的槽位
//! 2. POC 最小的槽位
//!
//! 池只增不减, 槽位格式与请求不一致时原地替换解码器实例.

use log::{debug, trace};

use crate::payload::{PayloadDecoder, ReferencePictures};
use crate::picture::{OutputStatus, PicNum, PictureDecoder, PictureFormat, RefPicList};
use crate::segment_header::SegmentHeader;

#[derive(Debug, Default)]
pub(crate) struct PicturePool {
    slots: Vec<PictureDecoder>,
}

impl PicturePool {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn slots(&self) -> &[PictureDecoder] {
        &self.slots
    }

    pub(crate) fn slot(&self, idx: usize) -> &PictureDecoder {
        &self.slots[idx]
    }

    pub(crate) fn slot_mut(&mut self, idx: usize) -> &mut PictureDecoder {
        &mut self.slots[idx]
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }

    /// 为新图像获取一个槽位
    pub(crate) fn acquire(&mut self, target_size: usize, format: PictureFormat) -> usize {
        if self.slots.len() < target_size {
            self.slots.push(PictureDecoder::new(format));
            trace!("图像池扩容: {} / {}", self.slots.len(), target_size);
            return self.slots.len() - 1;
        }
        let Some(idx) = self.select_victim() else {
            self.slots.push(PictureDecoder::new(format));
            return self.slots.len() - 1;
        };
        if self.slots[idx].format() != format {
            debug!(
                "图像池槽位 {} 格式变化: {} -> {}",
                idx,
                self.slots[idx].format(),
                format
            );
            self.slots[idx] = PictureDecoder::new(format);
        }
        idx
    }

    /// 选择回收槽位
    pub(crate) fn select_victim(&self) -> Option<usize> {
        let mut victim = None;
        let mut lowest_poc = PicNum::MAX;
        for (idx, pic) in self.slots.iter().enumerate() {
            let data = pic.pic_data();
            if data.output_status == OutputStatus::HasBeenOutput && (data.tid > 0 || !data.decoded)
            {
                return Some(idx);
            }
            if victim.is_none() || data.poc < lowest_poc {
                lowest_poc = data.poc;
                victim = Some(idx);
            }
        }
        victim
    }

    /// 尚未输出的已解码图像中 POC 最小者
    pub(crate) fn lowest_undisplayed(&self) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, pic)| {
                let data = pic.pic_data();
                data.decoded && data.output_status == OutputStatus::HasNotBeenOutput
            })
            .min_by_key(|(_, pic)| pic.pic_data().poc)
            .map(|(idx, _)| idx)
    }

    /// 解码 `idx` 槽位的载荷, 参考图像取自其参考列表指向的槽位
    pub(crate) fn decode(
        &mut self,
        idx: usize,
        segment: &SegmentHeader,
        payload: &[u8],
        backend: &mut dyn PayloadDecoder,
    ) -> bool {
        let mut target = std::mem::take(&mut self.slots[idx]);
        let lists = &target.pic_data().ref_pic_lists;
        let refs = ReferencePictures {
            l0: lists
                .entries(RefPicList::L0)
                .iter()
                .map(|entry| self.slots[entry.slot].rec_pic())
                .collect(),
            l1: lists
                .entries(RefPicList::L1)
                .iter()
                .map(|entry| self.slots[entry.slot].rec_pic())
                .collect(),
        };
        let ok = target.decode(segment, payload, &refs, backend);
        self.slots[idx] = target;
        ok
    }
}
