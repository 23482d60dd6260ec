//! 输出图像选择与统计信息.

use log::trace;

use super::SegmentDecoder;
use crate::frame::{DecodedPicture, PictureStats, STATS_MAX_REF_PICS};
use crate::picture::{OutputStatus, PicNum, RefPicList, ReferencePictureLists};
use crate::segment_header::{SegmentHeader, max_temporal_layer};

impl SegmentDecoder {
    /// 取出下一幅待输出图像 (POC 升序)
    ///
    /// 等待图像池填满期间或没有可输出图像时返回 `None`.
    /// 每输出一幅图像, 若缓冲中有可解码的单元则继续解码一个.
    pub fn get_decoded_picture(&mut self) -> Option<DecodedPicture> {
        if self.enforce_sliding_window && !self.has_picture_ready_for_output() {
            return None;
        }
        let idx = self.pool.lowest_undisplayed()?;
        self.pool.slot_mut(idx).pic_data_mut().output_status = OutputStatus::HasBeenOutput;

        let stats = self.output_stats(idx);
        let mut bytes = Vec::new();
        self.pool
            .slot(idx)
            .rec_pic()
            .copy_to(&mut bytes, &self.output);
        self.num_pics_in_flight = self.num_pics_in_flight.saturating_sub(1);
        trace!(
            "输出图像: poc={}, doc={}, soc={}, in_flight={}",
            stats.poc, stats.doc, stats.soc, self.num_pics_in_flight
        );

        if self.reorder.len() > self.num_tail_pics
            && self.num_pics_in_flight < self.pic_buffering_num + self.reorder.len()
        {
            self.decode_one_buffered_nal();
        }
        Some(DecodedPicture { bytes, stats })
    }

    /// 图像池已填满, 最小 POC 的图像不会再被更早的图像超越
    fn has_picture_ready_for_output(&self) -> bool {
        self.num_pics_in_flight >= self.pic_buffering_num
    }

    fn output_stats(&self, idx: usize) -> PictureStats {
        let pic = self.pool.slot(idx);
        let data = pic.pic_data();
        let segment = &self.curr_segment_header;
        // 滑动窗口长度减一即已出现过的最大 sub-GOP 长度
        let sub_gop_length = self.sliding_window_length.saturating_sub(1) as PicNum;
        let max_tid = self
            .temporal_gate
            .max_tid()
            .unwrap_or_else(|| max_temporal_layer(sub_gop_length));

        PictureStats {
            width: self.output.width,
            height: self.output.height,
            bitdepth: self.output.bitdepth,
            bitstream_bitdepth: pic.format().bitdepth,
            chroma_format: self.output.chroma_format,
            color_matrix: self.output_color_matrix,
            framerate: SegmentHeader::framerate(max_tid, segment.bitstream_ticks, sub_gop_length),
            bitstream_framerate: SegmentHeader::framerate(0, segment.bitstream_ticks, 1),
            nal_unit_type: data.nal_type,
            poc: data.poc as u32,
            doc: data.doc as u32,
            soc: data.soc,
            tid: data.tid,
            qp: data.qp,
            corrupted: data.corrupted,
            l0: ref_pocs(&data.ref_pic_lists, RefPicList::L0),
            l1: ref_pocs(&data.ref_pic_lists, RefPicList::L1),
        }
    }
}

/// 参考列表前几项的 POC, 不足以 -1 填充
fn ref_pocs(lists: &ReferencePictureLists, list: RefPicList) -> [i64; STATS_MAX_REF_PICS] {
    let mut pocs = [-1; STATS_MAX_REF_PICS];
    for (poc, entry) in pocs.iter_mut().zip(lists.entries(list)) {
        *poc = entry.poc as i64;
    }
    pocs
}
