//! NAL 单元分发与时间层过滤.

use bytes::Bytes;
use log::{debug, trace, warn};
use vela_core::VelaResult;
use vela_core::bitreader::BitReader;

use super::SegmentDecoder;
use crate::nal::{NalHeader, NalUnitType};

/// 时间层门限
///
/// 段头到达时按新段的帧率刻度重新计算上限并直接生效. 逐图像更新时,
/// 上限可以随时降低, 但只在 tid 0 图像处升高, 保证高时间层图像的参考都已被解码.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TemporalGate {
    max_tid: Option<u32>,
    target: u32,
}

impl TemporalGate {
    /// 段头处重新计算的上限, 立即生效
    pub(crate) fn set_target(&mut self, target: u32) {
        self.target = target;
        self.max_tid = Some(target);
    }

    /// 更新上限并判断该时间层是否需要解码
    pub(crate) fn admit(&mut self, tid: u32) -> bool {
        let Some(current) = self.max_tid else {
            return false;
        };
        let current = if self.target < current || tid == 0 {
            self.max_tid = Some(self.target);
            self.target
        } else {
            current
        };
        tid <= current
    }

    pub(crate) fn max_tid(&self) -> Option<u32> {
        self.max_tid
    }
}

/// 读取图像头前 4 位 (buffer_flag, tid) 后回退
fn peek_picture_flags(br: &mut BitReader) -> VelaResult<(bool, u32)> {
    let buffer_flag = br.read_flag()?;
    let tid = br.read_bits(3)?;
    br.rewind(4)?;
    Ok((buffer_flag, tid))
}

impl SegmentDecoder {
    /// 送入一个 NAL 单元
    ///
    /// 返回 false 表示单元未被处理 (保留扩展, 缺少有效段头, 非图像类型,
    /// 段头解析失败等), 这些都不是致命错误. 因时间层过滤被丢弃的图像返回 true.
    pub fn decode_nal(&mut self, nal_unit: &[u8]) -> bool {
        let mut br = BitReader::new(nal_unit);
        let Ok(header_byte) = br.read_byte() else {
            trace!("空 NAL 单元");
            return false;
        };
        let header = NalHeader::from_byte(header_byte);
        if header.is_extension() {
            debug!(
                "忽略扩展 NAL 单元: rfe={}, type={:?}",
                header.rfe, header.nal_type
            );
            return false;
        }

        if header.nal_type == NalUnitType::SegmentHeader {
            return self.decode_segment_header_nal(&mut br);
        }

        if !self.state.accepts_pictures() {
            trace!(
                "状态 {} 下拒绝 NAL 单元: type={:?}",
                self.state, header.nal_type
            );
            return false;
        }
        if !header.nal_type.is_picture() {
            trace!("忽略非图像 NAL 单元: type={:?}", header.nal_type);
            return false;
        }

        let (buffer_flag, tid) = match peek_picture_flags(&mut br) {
            Ok(flags) => flags,
            Err(err) => {
                warn!("图像单元头部截断: {}", err);
                return false;
            }
        };

        if !self.temporal_gate.admit(tid) {
            trace!(
                "丢弃高时间层图像: tid={}, max_tid={:?}",
                tid,
                self.temporal_gate.max_tid()
            );
            return true;
        }

        self.num_pics_in_flight += 1;
        self.reorder
            .push(Bytes::copy_from_slice(nal_unit), buffer_flag, self.num_tail_pics);
        if buffer_flag {
            self.num_tail_pics += 1;
            return true;
        }

        // 已解码未输出图像数 + 1 < 图像池大小时继续解码
        while !self.reorder.is_empty()
            && self.num_pics_in_flight + 1 < self.pic_buffering_num + self.reorder.len()
        {
            self.decode_one_buffered_nal();
        }
        true
    }
}
