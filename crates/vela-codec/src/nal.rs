//! NAL (Network Abstraction Layer) 单元头部定义与构造.
//!
//! NAL 头部为 1 字节:
//! - nal_rfe (2 bits): 保留扩展字段, 非零表示当前解码器无法识别, 整个单元被忽略
//! - nal_unit_type (5 bits)
//! - 保留位 (1 bit)
//!
//! 图像类 NAL 在头部之后紧跟 buffer_flag (1 bit) 与 tid (3 bits).

use vela_core::bitwriter::BitWriter;

/// NAL 单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NalUnitType {
    /// 帧内图像
    IntraPicture,
    /// 单向预测图像
    PredictedPicture,
    /// 双向预测图像
    BipredictedPicture,
    /// 保留的图像类型 (3..=10), 按普通图像处理
    ReservedPicture(u8),
    /// 段头 (流参数集)
    SegmentHeader,
    /// 前置 SEI
    SeiPrefix,
    /// 后置 SEI
    SeiSuffix,
    /// 访问单元分隔符
    AccessUnitDelimiter,
    /// 段结束标记
    EndOfSegment,
    /// 其他保留类型
    Reserved(u8),
}

impl NalUnitType {
    /// 最后一个图像类型编号
    pub const LAST_PICTURE_TYPE_ID: u8 = 10;

    /// 从 5 位类型编号创建
    pub fn from_type_id(id: u8) -> Self {
        match id {
            0 => Self::IntraPicture,
            1 => Self::PredictedPicture,
            2 => Self::BipredictedPicture,
            3..=10 => Self::ReservedPicture(id),
            16 => Self::SegmentHeader,
            17 => Self::SeiPrefix,
            18 => Self::SeiSuffix,
            19 => Self::AccessUnitDelimiter,
            20 => Self::EndOfSegment,
            _ => Self::Reserved(id),
        }
    }

    /// 获取类型编号
    pub fn type_id(&self) -> u8 {
        match self {
            Self::IntraPicture => 0,
            Self::PredictedPicture => 1,
            Self::BipredictedPicture => 2,
            Self::ReservedPicture(id) => *id,
            Self::SegmentHeader => 16,
            Self::SeiPrefix => 17,
            Self::SeiSuffix => 18,
            Self::AccessUnitDelimiter => 19,
            Self::EndOfSegment => 20,
            Self::Reserved(id) => *id,
        }
    }

    /// 是否为图像类单元 (IntraPicture..=ReservedPictureType10)
    pub fn is_picture(&self) -> bool {
        self.type_id() <= Self::LAST_PICTURE_TYPE_ID
    }

    /// 是否为帧内图像
    pub fn is_intra(&self) -> bool {
        matches!(self, Self::IntraPicture)
    }
}

/// 解析后的 1 字节 NAL 头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalHeader {
    /// 保留扩展字段 (2 bits)
    pub rfe: u8,
    /// 单元类型
    pub nal_type: NalUnitType,
}

impl NalHeader {
    /// 从头部字节解析
    pub fn from_byte(byte: u8) -> Self {
        Self {
            rfe: (byte >> 6) & 0x03,
            nal_type: NalUnitType::from_type_id((byte >> 1) & 0x1F),
        }
    }

    /// 编码为头部字节
    pub fn to_byte(&self) -> u8 {
        ((self.rfe & 0x03) << 6) | ((self.nal_type.type_id() & 0x1F) << 1)
    }

    /// 保留扩展字段非零时单元必须被静默忽略
    pub fn is_extension(&self) -> bool {
        self.rfe != 0
    }
}

impl From<NalUnitType> for NalHeader {
    fn from(nal_type: NalUnitType) -> Self {
        Self { rfe: 0, nal_type }
    }
}

/// 图像 NAL 单元构造器
///
/// 生成与 [`PictureDecoder::decode_header`](crate::picture::PictureDecoder::decode_header)
/// 对应的头部布局, 载荷原样追加在字节对齐之后.
#[derive(Debug, Clone)]
pub struct PictureUnitBuilder {
    nal_type: NalUnitType,
    buffer_flag: bool,
    tid: u8,
    sub_gop_length: Option<u8>,
    poc_offset: u8,
    qp: u8,
    payload: Vec<u8>,
}

impl PictureUnitBuilder {
    /// 创建指定类型的图像单元构造器
    pub fn new(nal_type: NalUnitType) -> Self {
        Self {
            nal_type,
            buffer_flag: false,
            tid: 0,
            sub_gop_length: None,
            poc_offset: 0,
            qp: 32,
            payload: Vec::new(),
        }
    }

    /// 设置 buffer_flag (尾部图像)
    pub fn buffer_flag(mut self, flag: bool) -> Self {
        self.buffer_flag = flag;
        self
    }

    /// 设置时间层 (0-7)
    pub fn tid(mut self, tid: u8) -> Self {
        self.tid = tid & 0x07;
        self
    }

    /// 显式携带新的 sub-GOP 长度
    pub fn sub_gop_length(mut self, length: u8) -> Self {
        self.sub_gop_length = Some(length);
        self
    }

    /// tid > 0 图像相对 sub-GOP 起点的 POC 偏移
    pub fn poc_offset(mut self, offset: u8) -> Self {
        self.poc_offset = offset;
        self
    }

    /// 图像量化参数 (0-127)
    pub fn qp(mut self, qp: u8) -> Self {
        self.qp = qp & 0x7F;
        self
    }

    /// 图像载荷
    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// 生成完整 NAL 单元字节
    pub fn build(self) -> Vec<u8> {
        let mut bw = BitWriter::with_capacity(8 + self.payload.len());
        bw.write_bits(u32::from(NalHeader::from(self.nal_type).to_byte()), 8);
        bw.write_flag(self.buffer_flag);
        bw.write_bits(u32::from(self.tid), 3);
        match self.sub_gop_length {
            Some(length) => {
                bw.write_flag(true);
                bw.write_bits(u32::from(length), 8);
            }
            None => bw.write_flag(false),
        }
        bw.write_bits(u32::from(self.poc_offset), 8);
        bw.write_bits(u32::from(self.qp), 7);
        bw.align_to_byte();
        bw.write_bytes(&self.payload);
        bw.finish()
    }
}
