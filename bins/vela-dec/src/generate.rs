//! 合成测试码流.
//!
//! 每段以段头开始, 第一幅为帧内图像, 之后每个 sub-GOP 先送锚点 (tid 0),
//! 再按时间层由低到高送出层级 B 图像. 每幅图像以 POC 决定的常量值填充,
//! 便于核对输出顺序.

use anyhow::{Result, bail};
use vela_codec::nal::{NalUnitType, PictureUnitBuilder};
use vela_codec::payload::encode_raw_payload;
use vela_codec::picture::{PictureFormat, ReconstructedPicture};
use vela_codec::segment_header::SegmentHeader;
use vela_core::{ChromaFormat, ColorMatrix};

/// 码流参数
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub width: u32,
    pub height: u32,
    pub chroma_format: ChromaFormat,
    pub color_matrix: ColorMatrix,
    pub bitdepth: u32,
    /// 每帧 90 kHz 刻度数
    pub ticks: u32,
    /// sub-GOP 长度, 2 的幂
    pub sub_gop_length: u32,
    pub sub_gops_per_segment: u32,
    pub segments: u32,
    pub open_gop: bool,
    pub num_ref_pics: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            width: 64,
            height: 32,
            chroma_format: ChromaFormat::Yuv420,
            color_matrix: ColorMatrix::Bt709,
            bitdepth: 8,
            ticks: 3000,
            sub_gop_length: 4,
            sub_gops_per_segment: 2,
            segments: 2,
            open_gop: false,
            num_ref_pics: 2,
        }
    }
}

impl GenerateOptions {
    fn validate(&self) -> Result<()> {
        if !self.sub_gop_length.is_power_of_two() || self.sub_gop_length > 128 {
            bail!("sub-GOP 长度 {} 必须是不超过 128 的 2 的幂", self.sub_gop_length);
        }
        if self.width == 0 || self.width > 0xFFFF || self.height == 0 || self.height > 0xFFFF {
            bail!("图像尺寸 {}x{} 非法", self.width, self.height);
        }
        if !(8..=16).contains(&self.bitdepth) {
            bail!("位深 {} 不在 8-16 范围内", self.bitdepth);
        }
        if self.chroma_format == ChromaFormat::Undefined {
            bail!("未指定色度格式");
        }
        if self.num_ref_pics > 15 {
            bail!("参考图像数 {} 超过 15", self.num_ref_pics);
        }
        if self.ticks == 0 || self.ticks >= 1 << 24 {
            bail!("帧率刻度 {} 非法", self.ticks);
        }
        Ok(())
    }

    fn segment_header(&self) -> SegmentHeader {
        SegmentHeader {
            pic_width: self.width,
            pic_height: self.height,
            chroma_format: self.chroma_format,
            color_matrix: self.color_matrix,
            internal_bitdepth: self.bitdepth,
            bitstream_ticks: self.ticks,
            max_sub_gop_length: u64::from(self.sub_gop_length),
            open_gop: self.open_gop,
            num_ref_pics: self.num_ref_pics,
            ..SegmentHeader::default()
        }
    }
}

/// 图像的填充值, 随 POC 变化且不超出位深范围
pub fn fill_value(poc: u64, bitdepth: u32) -> u16 {
    ((poc * 16 + 16) % (1u64 << bitdepth)) as u16
}

/// sub-GOP 内非锚点图像的 (tid, poc_offset), 按时间层升序
fn layered_offsets(sub_gop_length: u32) -> Vec<(u8, u8)> {
    let mut out = Vec::new();
    let mut step = sub_gop_length / 2;
    let mut tid = 1u8;
    while step > 0 {
        let mut offset = step;
        while offset < sub_gop_length {
            out.push((tid, offset as u8));
            offset += 2 * step;
        }
        step /= 2;
        tid += 1;
    }
    out
}

/// 生成完整码流的 NAL 单元序列
pub fn generate_stream(opts: &GenerateOptions) -> Result<Vec<Vec<u8>>> {
    opts.validate()?;
    let header = opts.segment_header();
    let format = PictureFormat {
        chroma_format: opts.chroma_format,
        width: opts.width,
        height: opts.height,
        bitdepth: opts.bitdepth,
    };
    let picture = |nal_type: NalUnitType, tid: u8, poc_offset: u8, poc: u64| {
        let mut rec = ReconstructedPicture::new(format);
        rec.fill(fill_value(poc, opts.bitdepth));
        PictureUnitBuilder::new(nal_type)
            .tid(tid)
            .poc_offset(poc_offset)
            .qp(32 - tid)
            .payload(encode_raw_payload(&rec))
            .build()
    };

    let length = u64::from(opts.sub_gop_length);
    let offsets = layered_offsets(opts.sub_gop_length);
    let mut units = Vec::new();
    let mut end_poc: Option<u64> = None;

    for _ in 0..opts.segments {
        units.push(header.to_nal_unit());
        let mut first_in_segment = true;
        for _ in 0..opts.sub_gops_per_segment {
            let nal_type = if first_in_segment {
                NalUnitType::IntraPicture
            } else {
                NalUnitType::PredictedPicture
            };
            first_in_segment = false;

            let start = match end_poc {
                None => {
                    // 码流第一幅图像单独构成长度为 0 的窗口
                    units.push(picture(nal_type, 0, 0, 0));
                    end_poc = Some(0);
                    continue;
                }
                Some(end) => end,
            };
            let end = start + length;
            units.push(picture(nal_type, 0, 0, end));
            for &(tid, offset) in &offsets {
                units.push(picture(
                    NalUnitType::BipredictedPicture,
                    tid,
                    offset,
                    start + u64::from(offset),
                ));
            }
            end_poc = Some(end);
        }
    }
    Ok(units)
}
