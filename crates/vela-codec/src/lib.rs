//! # vela-codec
//!
//! Vela 段级视频解码会话.
//!
//! 码流由段头 (Segment Header) 与图像 NAL 单元组成. [`SegmentDecoder`] 接收按显示
//! 顺序排列的 NAL 单元, 管理段切换, 重排序缓冲, 图像池与参考列表,
//! 并按 POC 升序输出解码图像.
//!
//! 载荷解码通过 [`PayloadDecoder`] trait 注入, 默认为未压缩样本格式
//! ([`RawPayloadDecoder`]).

pub mod convert;
pub mod decoder;
pub mod frame;
pub mod nal;
pub mod packet;
pub mod payload;
pub mod picture;
pub mod picture_header;
pub mod ref_list;
pub mod segment_header;
pub mod session;

// 重导出常用类型
pub use convert::OutputFormat;
pub use decoder::Decoder;
pub use frame::{DecodedPicture, PictureStats};
pub use nal::{NalHeader, NalUnitType, PictureUnitBuilder};
pub use packet::Packet;
pub use payload::{PayloadDecoder, RawPayloadDecoder, ReferencePictures};
pub use picture::{PicNum, PictureFormat, SegmentNum};
pub use segment_header::{SegmentHeader, SegmentHeaderError};
pub use session::{DecoderConfig, DecoderConfigBuilder, DecoderState, SegmentDecoder};
