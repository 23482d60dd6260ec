//! 解码输出图像与统计信息.

use vela_core::{ChromaFormat, ColorMatrix};

use crate::nal::NalUnitType;

/// 每个参考列表在统计信息中保留的参考 POC 数
pub const STATS_MAX_REF_PICS: usize = 5;

/// 输出图像的统计信息
#[derive(Debug, Clone, PartialEq)]
pub struct PictureStats {
    /// 输出宽度
    pub width: u32,
    /// 输出高度
    pub height: u32,
    /// 输出位深
    pub bitdepth: u32,
    /// 码流内部位深
    pub bitstream_bitdepth: u32,
    /// 输出色度格式
    pub chroma_format: ChromaFormat,
    pub color_matrix: ColorMatrix,
    /// 当前时间层上限下的帧率
    pub framerate: f64,
    /// 码流完整帧率
    pub bitstream_framerate: f64,
    pub nal_unit_type: NalUnitType,
    /// 以下三个序号只保留低 32 位
    pub poc: u32,
    pub doc: u32,
    pub soc: u32,
    pub tid: u32,
    pub qp: i32,
    /// 载荷校验失败的图像仍然输出, 以此标记
    pub corrupted: bool,
    /// L0 前 5 个参考的 POC, 不足以 -1 填充
    pub l0: [i64; STATS_MAX_REF_PICS],
    /// L1 前 5 个参考的 POC, 不足以 -1 填充
    pub l1: [i64; STATS_MAX_REF_PICS],
}

/// 一幅解码输出图像
#[derive(Debug, Clone)]
pub struct DecodedPicture {
    /// 按输出格式排列的样本字节 (平面顺序)
    pub bytes: Vec<u8>,
    pub stats: PictureStats,
}
