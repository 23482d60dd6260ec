//! 段头解码与段切换.

use std::sync::Arc;

use log::{debug, warn};
use vela_core::bitreader::BitReader;

use super::{DecoderState, SegmentDecoder};
use crate::segment_header::SegmentHeader;

impl SegmentDecoder {
    /// 处理段头单元, `br` 位于 NAL 头之后
    pub(super) fn decode_segment_header_nal(&mut self, br: &mut BitReader) -> bool {
        // 缓冲中除尾部图像外还有未解码单元时, 它们再也无法正确解码
        if self.reorder.len() > self.num_tail_pics {
            let dropped = self.reorder.clear();
            self.num_pics_in_flight = self.num_pics_in_flight.saturating_sub(dropped);
            self.num_tail_pics = 0;
            warn!("段头到达, 丢弃 {} 个未解码图像单元", dropped);
        }

        self.prev_segment_header = Arc::clone(&self.curr_segment_header);
        self.soc += 1;
        let header = match SegmentHeader::read(br, self.soc) {
            Ok(header) => header,
            Err(err) => {
                self.state = DecoderState::from_header_error(&err);
                warn!("段头解码失败: soc={}, {}", self.soc, err);
                return false;
            }
        };
        self.state = DecoderState::SegmentHeaderDecoded;

        self.sub_gop.length = header.max_sub_gop_length;
        self.sliding_window_length = self
            .sliding_window_length
            .max(header.max_sub_gop_length as usize + 1);
        self.pic_buffering_num = self
            .pic_buffering_num
            .max(self.sliding_window_length + header.num_ref_pics as usize);
        self.apply_output_defaults(&header);

        let target_tid = SegmentHeader::framerate_max_tid(
            self.config.decoder_ticks(),
            header.bitstream_ticks,
            header.max_sub_gop_length,
        );
        self.temporal_gate.set_target(target_tid);

        debug!(
            "段切换: soc={}, pic_buffering_num={}, max_tid={:?}, tails={}",
            self.soc,
            self.pic_buffering_num,
            self.temporal_gate.max_tid(),
            self.num_tail_pics
        );
        self.curr_segment_header = Arc::new(header);
        true
    }

    /// 第一个有效段头确定输出格式, 配置中固定的字段优先
    fn apply_output_defaults(&mut self, header: &SegmentHeader) {
        if self.output.width != 0 {
            return;
        }
        let (width, height) = self
            .config
            .output_size()
            .unwrap_or((header.pic_width, header.pic_height));
        self.output.width = width;
        self.output.height = height;
        self.output.chroma_format = self
            .config
            .output_chroma_format()
            .unwrap_or(header.chroma_format);
        self.output.bitdepth = self
            .config
            .output_bitdepth()
            .unwrap_or(header.internal_bitdepth);
        self.output_color_matrix = self
            .config
            .output_color_matrix()
            .unwrap_or(header.color_matrix);
        debug!(
            "输出格式: {}x{} {} {}bit {}",
            width,
            height,
            self.output.chroma_format,
            self.output.bitdepth,
            self.output_color_matrix
        );
    }
}
