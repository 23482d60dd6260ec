//! 缓冲单元解码与尾部刷新.

use std::sync::Arc;

use log::{debug, warn};
use vela_core::VelaResult;
use vela_core::bitreader::BitReader;

use super::SegmentDecoder;
use crate::ref_list::ReferenceListSorter;

/// 读取 NAL 头与 buffer_flag 后回到单元起点
fn peek_buffer_flag(br: &mut BitReader) -> VelaResult<bool> {
    br.read_byte()?;
    let buffer_flag = br.read_flag()?;
    br.rewind(9)?;
    Ok(buffer_flag)
}

impl SegmentDecoder {
    /// 从重排序缓冲队首取出一个单元并解码
    pub(super) fn decode_one_buffered_nal(&mut self) {
        if let Some(unit) = self.reorder.pop_front() {
            self.decode_buffered_unit(&unit);
        }
    }

    fn decode_buffered_unit(&mut self, unit: &[u8]) {
        let mut br = BitReader::new(unit);
        let buffer_flag = match peek_buffer_flag(&mut br) {
            Ok(flag) => flag,
            Err(err) => {
                warn!("缓冲单元头部截断: {}", err);
                self.num_pics_in_flight = self.num_pics_in_flight.saturating_sub(1);
                return;
            }
        };

        // 尾部图像属于上一段
        let segment = if buffer_flag {
            self.num_tail_pics = self.num_tail_pics.saturating_sub(1);
            Arc::clone(&self.prev_segment_header)
        } else {
            Arc::clone(&self.curr_segment_header)
        };

        let idx = self
            .pool
            .acquire(self.pic_buffering_num, segment.picture_format());
        let header = self.pool.slot_mut(idx).decode_header(
            &mut br,
            &mut self.sub_gop,
            segment.max_sub_gop_length,
            self.doc,
            self.soc,
        );
        if let Err(err) = header {
            warn!("图像头解码失败, 丢弃图像: doc={}, {}", self.doc, err);
            self.pool.slot_mut(idx).discard();
            self.num_pics_in_flight = self.num_pics_in_flight.saturating_sub(1);
            self.num_corrupted_pics += 1;
            self.state = self.state.after_picture(false);
            return;
        }
        self.pool
            .slot_mut(idx)
            .pic_data_mut()
            .apply_segment_params(&segment);

        let sorter = ReferenceListSorter::new(
            self.prev_segment_header.open_gop,
            segment.num_ref_pics as usize,
        );
        let ref_pic_lists = sorter.prepare_ref_pic_lists(idx, self.pool.slots());
        self.pool.slot_mut(idx).pic_data_mut().ref_pic_lists = ref_pic_lists;

        let ok = self.pool.decode(
            idx,
            &segment,
            br.remaining_bytes(),
            self.payload_decoder.as_mut(),
        );
        if !ok {
            self.num_corrupted_pics += 1;
            warn!(
                "图像载荷校验失败: poc={}, doc={}",
                self.pool.slot(idx).pic_data().poc,
                self.pool.slot(idx).pic_data().doc
            );
        }
        self.state = self.state.after_picture(ok);
        self.doc = self.pool.slot(idx).pic_data().doc + 1;
    }

    /// 码流或段结束时解码剩余的尾部图像
    ///
    /// 缓冲中还有非尾部单元时推迟执行, 需先取出图像腾出空间.
    /// 刷新后不再等待图像池填满即可输出.
    pub fn flush_buffered_tail_pics(&mut self) {
        if self.reorder.len() > self.num_tail_pics {
            debug!(
                "推迟尾部刷新: 缓冲 {} 个单元, 尾部图像 {} 个",
                self.reorder.len(),
                self.num_tail_pics
            );
            return;
        }
        self.enforce_sliding_window = false;
        self.soc += 1;
        self.prev_segment_header = Arc::clone(&self.curr_segment_header);
        if self.reorder.is_empty() {
            return;
        }

        if self.curr_segment_header.open_gop {
            // 开放 GOP 的尾部图像依赖下一段的图像, 没有下一段时无法解码
            let dropped = self.reorder.clear();
            self.num_pics_in_flight = self.num_pics_in_flight.saturating_sub(dropped);
            self.num_tail_pics = 0;
            debug!("开放 GOP 刷新, 丢弃 {} 个尾部图像", dropped);
            return;
        }

        // 封闭 GOP: 跳过缺失的下一个锚点图像
        self.doc += 1;
        self.sub_gop.step_forward();
        for unit in self.reorder.drain_all() {
            self.decode_buffered_unit(&unit);
        }
    }
}
