//! 图像级数据结构.
//!
//! - [`PictureData`]: 一幅图像的头部信息, 顺序号与参考列表
//! - [`ReconstructedPicture`]: 重建样本平面
//! - [`PictureDecoder`]: 图像池中的一个槽位, 组合以上两者

use std::fmt;

use log::trace;
use vela_core::ChromaFormat;

use crate::nal::NalUnitType;
use crate::payload::{PayloadDecoder, ReferencePictures};
use crate::segment_header::SegmentHeader;

/// 图像序号 (POC / DOC) 类型
pub type PicNum = u64;
/// 段序号 (SOC) 类型
pub type SegmentNum = u32;

/// 重建图像的格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureFormat {
    pub chroma_format: ChromaFormat,
    pub width: u32,
    pub height: u32,
    pub bitdepth: u32,
}

impl Default for PictureFormat {
    fn default() -> Self {
        Self {
            chroma_format: ChromaFormat::Undefined,
            width: 0,
            height: 0,
            bitdepth: 8,
        }
    }
}

impl fmt::Display for PictureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} {} {}bit",
            self.width, self.height, self.chroma_format, self.bitdepth
        )
    }
}

/// 图像输出状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputStatus {
    /// 尚未输出
    #[default]
    HasNotBeenOutput,
    /// 已输出 (或已被丢弃)
    HasBeenOutput,
}

/// 参考列表编号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefPicList {
    L0,
    L1,
}

/// 参考列表中的一项: 池槽位索引 + 被参考图像的 POC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefEntry {
    pub slot: usize,
    pub poc: PicNum,
}

/// 一幅图像的 L0 / L1 参考列表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferencePictureLists {
    l0: Vec<RefEntry>,
    l1: Vec<RefEntry>,
}

impl ReferencePictureLists {
    /// 由已排序的两个列表创建
    pub fn new(l0: Vec<RefEntry>, l1: Vec<RefEntry>) -> Self {
        Self { l0, l1 }
    }

    /// 列表中的全部项
    pub fn entries(&self, list: RefPicList) -> &[RefEntry] {
        match list {
            RefPicList::L0 => &self.l0,
            RefPicList::L1 => &self.l1,
        }
    }

    pub fn num_ref_pics(&self, list: RefPicList) -> usize {
        self.entries(list).len()
    }

    /// 第 `idx` 个参考的 POC
    pub fn ref_poc(&self, list: RefPicList, idx: usize) -> Option<PicNum> {
        self.entries(list).get(idx).map(|entry| entry.poc)
    }

    pub fn clear(&mut self) {
        self.l0.clear();
        self.l1.clear();
    }
}

/// 图像头部与解码状态
#[derive(Debug, Clone)]
pub struct PictureData {
    pub nal_type: NalUnitType,
    /// 显示顺序号
    pub poc: PicNum,
    /// 解码顺序号
    pub doc: PicNum,
    /// 段序号
    pub soc: SegmentNum,
    /// 时间层
    pub tid: u32,
    pub qp: i32,
    pub output_status: OutputStatus,
    /// 载荷是否已完整解码 (校验失败的图像同样为 true)
    pub decoded: bool,
    /// 载荷校验失败
    pub corrupted: bool,
    pub adaptive_qp: bool,
    pub deblock: u32,
    pub beta_offset: i32,
    pub tc_offset: i32,
    pub ref_pic_lists: ReferencePictureLists,
}

impl Default for PictureData {
    fn default() -> Self {
        Self {
            nal_type: NalUnitType::IntraPicture,
            poc: 0,
            doc: 0,
            soc: 0,
            tid: 0,
            qp: 0,
            output_status: OutputStatus::HasBeenOutput,
            decoded: false,
            corrupted: false,
            adaptive_qp: false,
            deblock: 0,
            beta_offset: 0,
            tc_offset: 0,
            ref_pic_lists: ReferencePictureLists::default(),
        }
    }
}

impl PictureData {
    /// 是否为帧内图像
    pub fn is_intra(&self) -> bool {
        self.nal_type.is_intra()
    }

    /// 写入段级编码参数
    pub fn apply_segment_params(&mut self, segment: &SegmentHeader) {
        self.adaptive_qp = segment.adaptive_qp;
        self.deblock = segment.deblock;
        self.beta_offset = segment.beta_offset;
        self.tc_offset = segment.tc_offset;
    }
}

/// 重建图像样本
///
/// 每个平面按行主序存放 `u16` 样本, 与位深无关.
#[derive(Debug, Clone, Default)]
pub struct ReconstructedPicture {
    format: PictureFormat,
    planes: Vec<Vec<u16>>,
}

impl ReconstructedPicture {
    /// 按格式分配平面, 以中间灰度填充
    pub fn new(format: PictureFormat) -> Self {
        let mid = mid_grey(format.bitdepth);
        let planes = (0..format.chroma_format.plane_count())
            .map(|plane| {
                let w = format.chroma_format.plane_width(plane, format.width);
                let h = format.chroma_format.plane_height(plane, format.height);
                vec![mid; w * h]
            })
            .collect();
        Self { format, planes }
    }

    pub fn format(&self) -> PictureFormat {
        self.format
    }

    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    /// 指定平面的样本
    pub fn plane(&self, plane: usize) -> &[u16] {
        self.planes.get(plane).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn plane_mut(&mut self, plane: usize) -> &mut [u16] {
        &mut self.planes[plane]
    }

    /// 以同一个值填充所有平面
    pub fn fill(&mut self, value: u16) {
        for plane in &mut self.planes {
            plane.fill(value);
        }
    }

    /// 以中间灰度填充
    pub fn fill_mid_grey(&mut self) {
        self.fill(mid_grey(self.format.bitdepth));
    }

    /// 从同格式的图像复制样本, 格式不同时返回 false
    pub fn copy_samples_from(&mut self, other: &ReconstructedPicture) -> bool {
        if self.format != other.format {
            return false;
        }
        for (dst, src) in self.planes.iter_mut().zip(&other.planes) {
            dst.copy_from_slice(src);
        }
        true
    }
}

/// 给定位深的中间灰度值
pub fn mid_grey(bitdepth: u32) -> u16 {
    1u16 << (bitdepth.clamp(1, 16) - 1)
}

/// 图像池槽位: 单幅图像的解码器实例
#[derive(Debug, Default)]
pub struct PictureDecoder {
    data: PictureData,
    rec: ReconstructedPicture,
}

impl PictureDecoder {
    /// 按格式创建新的解码器实例
    pub fn new(format: PictureFormat) -> Self {
        Self {
            data: PictureData::default(),
            rec: ReconstructedPicture::new(format),
        }
    }

    pub fn format(&self) -> PictureFormat {
        self.rec.format()
    }

    pub fn pic_data(&self) -> &PictureData {
        &self.data
    }

    pub fn pic_data_mut(&mut self) -> &mut PictureData {
        &mut self.data
    }

    pub fn rec_pic(&self) -> &ReconstructedPicture {
        &self.rec
    }

    /// 放弃当前图像: 不再参与输出和参考
    pub fn discard(&mut self) {
        self.data.output_status = OutputStatus::HasBeenOutput;
        self.data.decoded = false;
        self.data.ref_pic_lists.clear();
    }

    /// 解码图像载荷, 返回载荷是否通过校验
    ///
    /// 参考图像来自池中其他槽位.
    pub fn decode(
        &mut self,
        segment: &SegmentHeader,
        payload: &[u8],
        refs: &ReferencePictures<'_>,
        backend: &mut dyn PayloadDecoder,
    ) -> bool {
        let ok = backend.decode(segment, &self.data, payload, refs, &mut self.rec);
        self.data.decoded = true;
        self.data.corrupted = !ok;
        trace!(
            "图像解码完成: poc={}, doc={}, tid={}, ok={}",
            self.data.poc, self.data.doc, self.data.tid, ok
        );
        ok
    }
}
