//! 解码会话状态.

use std::fmt;

use crate::segment_header::SegmentHeaderError;

/// 最近一次段头或图像解码的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderState {
    /// 尚未解码出有效段头
    #[default]
    NoSegmentHeader,
    /// 码流版本高于解码器支持的版本
    DecoderVersionTooLow,
    /// 码流位深超过解码器上限
    BitstreamBitdepthTooHigh,
    /// 段头解码成功
    SegmentHeaderDecoded,
    /// 图像解码成功
    PicDecoded,
    /// 图像载荷校验失败, 直到下一个段头前保持不变
    ChecksumMismatch,
}

impl DecoderState {
    /// 当前状态下是否接受图像单元
    pub fn accepts_pictures(&self) -> bool {
        !matches!(
            self,
            Self::NoSegmentHeader | Self::DecoderVersionTooLow | Self::BitstreamBitdepthTooHigh
        )
    }

    /// 段头解析失败后的状态
    pub(crate) fn from_header_error(err: &SegmentHeaderError) -> Self {
        match err {
            SegmentHeaderError::VersionTooLow { .. } => Self::DecoderVersionTooLow,
            SegmentHeaderError::BitdepthTooHigh(_) => Self::BitstreamBitdepthTooHigh,
            SegmentHeaderError::Malformed(_) => Self::NoSegmentHeader,
        }
    }

    /// 图像解码后的状态, 校验失败状态保持到下一个段头
    pub(crate) fn after_picture(self, checksum_ok: bool) -> Self {
        match (self, checksum_ok) {
            (_, false) | (Self::ChecksumMismatch, true) => Self::ChecksumMismatch,
            (_, true) => Self::PicDecoded,
        }
    }
}

impl fmt::Display for DecoderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoSegmentHeader => "no-segment-header",
            Self::DecoderVersionTooLow => "decoder-version-too-low",
            Self::BitstreamBitdepthTooHigh => "bitstream-bitdepth-too-high",
            Self::SegmentHeaderDecoded => "segment-header-decoded",
            Self::PicDecoded => "pic-decoded",
            Self::ChecksumMismatch => "checksum-mismatch",
        };
        write!(f, "{name}")
    }
}
