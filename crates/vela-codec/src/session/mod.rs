//! 段级解码会话.
//!
//! 调用方按显示顺序逐个送入 NAL 单元 ([`SegmentDecoder::decode_nal`]),
//! 再通过 [`SegmentDecoder::get_decoded_picture`] 按 POC 升序取回图像.
//!
//! 内部组成:
//! - NAL 分发 (`dispatch.rs`): 解析单元头, 时间层过滤, 入重排序缓冲
//! - 段切换 (`transition.rs`): 段头解码, 维护当前段/上一段
//! - 缓冲解码 (`buffered.rs`): 取出一个缓冲单元完成解码, 尾部刷新
//! - 输出选择 (`output.rs`): 选出 POC 最小的未输出图像并转换格式
//! - 图像池 (`pool.rs`), 重排序缓冲 (`reorder.rs`), 状态 (`state.rs`), 配置 (`config.rs`)

mod buffered;
mod config;
mod dispatch;
mod output;
mod pool;
mod reorder;
mod state;
mod transition;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use log::{debug, trace};
use vela_core::{ChromaFormat, ColorMatrix, VelaError, VelaResult};

use crate::convert::OutputFormat;
use crate::decoder::Decoder;
use crate::frame::DecodedPicture;
use crate::packet::Packet;
use crate::payload::{PayloadDecoder, RawPayloadDecoder};
use crate::picture::{PicNum, SegmentNum};
use crate::picture_header::SubGopWindow;
use crate::segment_header::SegmentHeader;

pub use config::{DecoderConfig, DecoderConfigBuilder, MAX_DECODER_TICKS};
pub use state::DecoderState;

use dispatch::TemporalGate;
use pool::PicturePool;
use reorder::ReorderBuffer;

/// 段级解码会话
pub struct SegmentDecoder {
    config: DecoderConfig,
    /// 最近一次段头或图像解码的结果
    state: DecoderState,

    // ========================
    // 段头
    // ========================
    curr_segment_header: Arc<SegmentHeader>,
    prev_segment_header: Arc<SegmentHeader>,
    /// 段序号, 每个段头和每次尾部刷新加一
    soc: SegmentNum,

    // ========================
    // 缓冲与图像池
    // ========================
    reorder: ReorderBuffer,
    pool: PicturePool,
    payload_decoder: Box<dyn PayloadDecoder>,
    /// 已接收但尚未输出的图像数 (含缓冲中未解码的单元)
    num_pics_in_flight: usize,
    /// 缓冲中待解码的尾部图像数
    num_tail_pics: usize,
    /// 载荷校验失败的图像累计数
    num_corrupted_pics: u64,
    sliding_window_length: usize,
    /// 图像池目标大小, 只增不减
    pic_buffering_num: usize,
    /// 输出前是否等待图像池填满, 尾部刷新后永久关闭
    enforce_sliding_window: bool,

    // ========================
    // 顺序号与时间层
    // ========================
    /// 下一幅图像的解码顺序号
    doc: PicNum,
    sub_gop: SubGopWindow,
    temporal_gate: TemporalGate,

    // ========================
    // 输出格式 (第一个有效段头确定后保持不变)
    // ========================
    output: OutputFormat,
    output_color_matrix: ColorMatrix,

    /// `Decoder` 接口已收到空包
    flushing: bool,
}

impl SegmentDecoder {
    /// 使用默认载荷解码器创建会话
    pub fn new(config: DecoderConfig) -> Self {
        Self::with_payload_decoder(config, Box::new(RawPayloadDecoder::new()))
    }

    /// 使用指定载荷解码器创建会话
    pub fn with_payload_decoder(
        config: DecoderConfig,
        payload_decoder: Box<dyn PayloadDecoder>,
    ) -> Self {
        debug!(
            "创建解码会话: payload={}, ticks={}, enforce_sliding_window={}",
            payload_decoder.name(),
            config.decoder_ticks(),
            config.enforce_sliding_window()
        );
        let enforce_sliding_window = config.enforce_sliding_window();
        Self {
            config,
            state: DecoderState::NoSegmentHeader,
            curr_segment_header: Arc::new(SegmentHeader::default()),
            prev_segment_header: Arc::new(SegmentHeader::default()),
            soc: 0,
            reorder: ReorderBuffer::new(),
            pool: PicturePool::new(),
            payload_decoder,
            num_pics_in_flight: 0,
            num_tail_pics: 0,
            num_corrupted_pics: 0,
            sliding_window_length: 0,
            pic_buffering_num: 0,
            enforce_sliding_window,
            doc: 0,
            sub_gop: SubGopWindow::default(),
            temporal_gate: TemporalGate::default(),
            output: OutputFormat {
                width: 0,
                height: 0,
                chroma_format: ChromaFormat::Undefined,
                bitdepth: 0,
            },
            output_color_matrix: ColorMatrix::Undefined,
            flushing: false,
        }
    }

    /// 以默认配置创建 (框架接口)
    pub fn create() -> VelaResult<Box<dyn Decoder>> {
        Ok(Box::new(Self::new(DecoderConfig::default())))
    }

    /// 清空会话状态, 保留配置与载荷解码器
    pub fn reset(&mut self) {
        self.state = DecoderState::NoSegmentHeader;
        self.curr_segment_header = Arc::new(SegmentHeader::default());
        self.prev_segment_header = Arc::new(SegmentHeader::default());
        self.soc = 0;
        self.reorder.clear();
        self.pool.clear();
        self.num_pics_in_flight = 0;
        self.num_tail_pics = 0;
        self.num_corrupted_pics = 0;
        self.sliding_window_length = 0;
        self.pic_buffering_num = 0;
        self.enforce_sliding_window = self.config.enforce_sliding_window();
        self.doc = 0;
        self.sub_gop = SubGopWindow::default();
        self.temporal_gate = TemporalGate::default();
        self.output.width = 0;
        self.output.height = 0;
        self.output.chroma_format = ChromaFormat::Undefined;
        self.output.bitdepth = 0;
        self.output_color_matrix = ColorMatrix::Undefined;
        self.flushing = false;
        debug!("解码会话已重置");
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// 当前会话状态
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// 当前段头
    pub fn segment_header(&self) -> &SegmentHeader {
        &self.curr_segment_header
    }

    /// 载荷校验失败的图像累计数
    pub fn num_corrupted_pics(&self) -> u64 {
        self.num_corrupted_pics
    }

    /// 已接收但尚未输出的图像数
    pub fn num_pics_in_flight(&self) -> usize {
        self.num_pics_in_flight
    }

    /// 待解码的尾部图像数
    pub fn num_tail_pics(&self) -> usize {
        self.num_tail_pics
    }

    /// 重排序缓冲中的单元数
    pub fn num_buffered_nals(&self) -> usize {
        self.reorder.len()
    }

    /// 图像池当前槽位数
    pub fn num_pool_slots(&self) -> usize {
        self.pool.len()
    }

    /// 图像池目标大小
    pub fn pic_buffering_num(&self) -> usize {
        self.pic_buffering_num
    }

    /// 当前时间层上限, 未收到段头前为 `None`
    pub fn max_tid(&self) -> Option<u32> {
        self.temporal_gate.max_tid()
    }

    /// 下一幅图像的解码顺序号
    pub fn next_doc(&self) -> PicNum {
        self.doc
    }

    /// 当前段序号
    pub fn soc(&self) -> SegmentNum {
        self.soc
    }

    /// 第一个有效段头确定的输出格式
    pub fn output_format(&self) -> OutputFormat {
        self.output
    }
}

impl Decoder for SegmentDecoder {
    fn name(&self) -> &str {
        "vela"
    }

    fn send_packet(&mut self, packet: &Packet) -> VelaResult<()> {
        if packet.is_empty() {
            self.flushing = true;
            self.flush_buffered_tail_pics();
            return Ok(());
        }
        self.flushing = false;
        if !self.decode_nal(&packet.data) {
            trace!("数据包未被解码: pos={}, size={}", packet.pos, packet.size());
        }
        Ok(())
    }

    fn receive_frame(&mut self) -> VelaResult<DecodedPicture> {
        loop {
            if let Some(picture) = self.get_decoded_picture() {
                return Ok(picture);
            }
            if !self.flushing {
                return Err(VelaError::NeedMoreData);
            }
            // 刷新被推迟时, 图像输出腾出空间后重试
            let before = (self.reorder.len(), self.enforce_sliding_window);
            if before == (0, false) {
                return Err(VelaError::Eof);
            }
            self.flush_buffered_tail_pics();
            if (self.reorder.len(), self.enforce_sliding_window) == before {
                return Err(VelaError::Eof);
            }
        }
    }

    fn flush(&mut self) {
        self.reset();
    }
}
