//! 段头 (Segment Header) 解析与写入.
//!
//! 段头是码流的参数集, 描述其后所有图像共用的尺寸, 色度格式, 位深,
//! 帧率刻度, sub-GOP 结构与参考配置. 段头在解码后不可变, 会话以
//! `Arc<SegmentHeader>` 快照的形式在 "当前段" 与 "上一段" 之间共享.

use log::debug;
use thiserror::Error;
use vela_core::bitreader::BitReader;
use vela_core::bitwriter::BitWriter;
use vela_core::{ChromaFormat, ColorMatrix, VelaError};

use crate::nal::{NalHeader, NalUnitType};
use crate::picture::{PicNum, PictureFormat, SegmentNum};

/// 解码器支持的最高码流主版本
pub const SUPPORTED_VERSION_MAJOR: u16 = 1;
/// 解码器支持的最高码流次版本
pub const SUPPORTED_VERSION_MINOR: u16 = 0;
/// 解码器支持的最大内部位深
pub const MAX_BITDEPTH: u32 = 16;
/// 帧率刻度的时间基 (90 kHz)
pub const TIME_SCALE: u32 = 90_000;

/// 段头解析错误
#[derive(Debug, Error)]
pub enum SegmentHeaderError {
    /// 码流版本高于解码器支持的版本
    #[error("码流版本 {major}.{minor} 高于解码器支持的版本")]
    VersionTooLow { major: u16, minor: u16 },
    /// 码流位深超过解码器上限
    #[error("码流位深 {0} 超过解码器上限")]
    BitdepthTooHigh(u32),
    /// 段头字段非法或数据截断
    #[error("段头数据非法: {0}")]
    Malformed(#[from] VelaError),
}

/// 段头
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHeader {
    /// 段序号 (SOC)
    pub soc: SegmentNum,
    pub version_major: u16,
    pub version_minor: u16,
    /// 图像宽度 (亮度采样)
    pub pic_width: u32,
    /// 图像高度 (亮度采样)
    pub pic_height: u32,
    pub chroma_format: ChromaFormat,
    pub color_matrix: ColorMatrix,
    /// 内部位深
    pub internal_bitdepth: u32,
    /// 每帧占用的 90 kHz 刻度数
    pub bitstream_ticks: u32,
    /// 最大 sub-GOP 长度
    pub max_sub_gop_length: PicNum,
    /// 开放 GOP: 下一段的图像可以跨段参考本段图像
    pub open_gop: bool,
    /// 每个参考列表的最大参考数
    pub num_ref_pics: u32,
    pub adaptive_qp: bool,
    /// 去块滤波模式: 0 关闭, 1 默认参数, 2 显式偏移
    pub deblock: u32,
    pub beta_offset: i32,
    pub tc_offset: i32,
}

impl Default for SegmentHeader {
    fn default() -> Self {
        Self {
            soc: 0,
            version_major: SUPPORTED_VERSION_MAJOR,
            version_minor: SUPPORTED_VERSION_MINOR,
            pic_width: 0,
            pic_height: 0,
            chroma_format: ChromaFormat::Undefined,
            color_matrix: ColorMatrix::Undefined,
            internal_bitdepth: 8,
            bitstream_ticks: 0,
            max_sub_gop_length: 0,
            open_gop: false,
            num_ref_pics: 0,
            adaptive_qp: false,
            deblock: 0,
            beta_offset: 0,
            tc_offset: 0,
        }
    }
}

impl SegmentHeader {
    /// 从 NAL 头之后的比特流解析段头
    ///
    /// 先校验版本, 再校验位深, 最后校验其余字段的取值范围.
    pub fn read(br: &mut BitReader, soc: SegmentNum) -> Result<Self, SegmentHeaderError> {
        let version_major = br.read_bits(16)? as u16;
        let version_minor = br.read_bits(16)? as u16;
        if version_major > SUPPORTED_VERSION_MAJOR
            || (version_major == SUPPORTED_VERSION_MAJOR
                && version_minor > SUPPORTED_VERSION_MINOR)
        {
            return Err(SegmentHeaderError::VersionTooLow {
                major: version_major,
                minor: version_minor,
            });
        }

        let pic_width = br.read_bits(16)?;
        let pic_height = br.read_bits(16)?;
        let chroma_code = br.read_bits(4)?;
        let color_matrix = ColorMatrix::from_code(br.read_bits(4)?);
        let internal_bitdepth = br.read_bits(4)? + 8;
        if internal_bitdepth > MAX_BITDEPTH {
            return Err(SegmentHeaderError::BitdepthTooHigh(internal_bitdepth));
        }

        let bitstream_ticks = br.read_bits(24)?;
        let max_sub_gop_length = PicNum::from(br.read_bits(8)?);
        let open_gop = br.read_flag()?;
        let num_ref_pics = br.read_bits(4)?;
        let adaptive_qp = br.read_flag()?;
        let deblock = br.read_bits(2)?;
        let (beta_offset, tc_offset) = if deblock == 2 {
            (br.read_bits_signed(6)?, br.read_bits_signed(6)?)
        } else {
            (0, 0)
        };

        let chroma_format = ChromaFormat::from_code(chroma_code).ok_or_else(|| {
            VelaError::InvalidData(format!("未知的色度格式编号 {}", chroma_code))
        })?;
        if pic_width == 0 || pic_height == 0 {
            return Err(VelaError::InvalidData(format!(
                "图像尺寸非法: {}x{}",
                pic_width, pic_height
            ))
            .into());
        }
        if bitstream_ticks == 0 {
            return Err(VelaError::InvalidData("帧率刻度不能为 0".into()).into());
        }
        if max_sub_gop_length == 0 {
            return Err(VelaError::InvalidData("sub-GOP 长度不能为 0".into()).into());
        }
        if deblock == 3 {
            return Err(VelaError::InvalidData("去块滤波模式 3 为保留值".into()).into());
        }

        let header = Self {
            soc,
            version_major,
            version_minor,
            pic_width,
            pic_height,
            chroma_format,
            color_matrix,
            internal_bitdepth,
            bitstream_ticks,
            max_sub_gop_length,
            open_gop,
            num_ref_pics,
            adaptive_qp,
            deblock,
            beta_offset,
            tc_offset,
        };
        debug!(
            "段头: soc={}, {}x{} {} {}bit, ticks={}, sub_gop={}, open_gop={}, refs={}",
            soc,
            pic_width,
            pic_height,
            chroma_format,
            internal_bitdepth,
            bitstream_ticks,
            max_sub_gop_length,
            open_gop,
            num_ref_pics,
        );
        Ok(header)
    }

    /// 将段头写入比特流 (不含 NAL 头)
    pub fn write(&self, bw: &mut BitWriter) {
        bw.write_bits(u32::from(self.version_major), 16);
        bw.write_bits(u32::from(self.version_minor), 16);
        bw.write_bits(self.pic_width, 16);
        bw.write_bits(self.pic_height, 16);
        bw.write_bits(self.chroma_format.code(), 4);
        bw.write_bits(self.color_matrix.code(), 4);
        bw.write_bits(self.internal_bitdepth.saturating_sub(8), 4);
        bw.write_bits(self.bitstream_ticks, 24);
        bw.write_bits(self.max_sub_gop_length as u32, 8);
        bw.write_flag(self.open_gop);
        bw.write_bits(self.num_ref_pics, 4);
        bw.write_flag(self.adaptive_qp);
        bw.write_bits(self.deblock, 2);
        if self.deblock == 2 {
            bw.write_bits_signed(self.beta_offset, 6);
            bw.write_bits_signed(self.tc_offset, 6);
        }
    }

    /// 生成完整的段头 NAL 单元
    pub fn to_nal_unit(&self) -> Vec<u8> {
        let mut bw = BitWriter::with_capacity(20);
        bw.write_bits(
            u32::from(NalHeader::from(NalUnitType::SegmentHeader).to_byte()),
            8,
        );
        self.write(&mut bw);
        bw.align_to_byte();
        bw.finish()
    }

    /// 本段图像的重建格式
    pub fn picture_format(&self) -> PictureFormat {
        PictureFormat {
            chroma_format: self.chroma_format,
            width: self.pic_width,
            height: self.pic_height,
            bitdepth: self.internal_bitdepth,
        }
    }

    /// 在给定解码器刻度下应解码的最高时间层
    ///
    /// `decoder_ticks` 为 0 表示不做时间层降采样.
    pub fn framerate_max_tid(decoder_ticks: u32, bitstream_ticks: u32, sub_gop_length: PicNum) -> u32 {
        let full = max_temporal_layer(sub_gop_length);
        if decoder_ticks == 0 || bitstream_ticks == 0 || decoder_ticks <= bitstream_ticks {
            return full;
        }
        let factor = decoder_ticks / bitstream_ticks;
        let dropped_layers = factor.ilog2();
        full.saturating_sub(dropped_layers)
    }

    /// 只解码到 `max_tid` 层时的实际帧率
    pub fn framerate(max_tid: u32, bitstream_ticks: u32, sub_gop_length: PicNum) -> f64 {
        if bitstream_ticks == 0 {
            return 0.0;
        }
        let full_rate = f64::from(TIME_SCALE) / f64::from(bitstream_ticks);
        let layers = max_temporal_layer(sub_gop_length);
        if max_tid >= layers {
            full_rate
        } else {
            full_rate / f64::from(1u32 << (layers - max_tid).min(31))
        }
    }
}

/// sub-GOP 长度对应的最高时间层 (向上取整的 log2)
pub fn max_temporal_layer(sub_gop_length: PicNum) -> u32 {
    if sub_gop_length <= 1 {
        0
    } else {
        (sub_gop_length - 1).ilog2() + 1
    }
}
