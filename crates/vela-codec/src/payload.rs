//! 图像载荷解码.
//!
//! 会话把载荷解码视为不透明能力, 通过 [`PayloadDecoder`] trait 注入.
//! 默认实现 [`RawPayloadDecoder`] 读取未压缩样本并以 CRC-16 校验.

use log::warn;
use vela_core::crc::Crc16;

use crate::picture::{PictureData, ReconstructedPicture};
use crate::segment_header::SegmentHeader;

/// 当前图像可用的参考重建图像, 顺序与参考列表一致
#[derive(Debug, Default)]
pub struct ReferencePictures<'a> {
    pub l0: Vec<&'a ReconstructedPicture>,
    pub l1: Vec<&'a ReconstructedPicture>,
}

/// 图像载荷解码器
pub trait PayloadDecoder: Send {
    /// 解码器名称
    fn name(&self) -> &str;

    /// 将载荷解码到 `rec`
    ///
    /// 返回 false 表示载荷校验失败. 失败时 `rec` 中的样本仍然保留,
    /// 图像照常参与输出.
    fn decode(
        &mut self,
        segment: &SegmentHeader,
        pic: &PictureData,
        payload: &[u8],
        refs: &ReferencePictures<'_>,
        rec: &mut ReconstructedPicture,
    ) -> bool;
}

/// 未压缩样本载荷
///
/// 布局: 按平面顺序存放全部样本 (位深 <= 8 时每样本 1 字节, 否则 2 字节大端),
/// 末尾附 2 字节大端 CRC-16. 空载荷表示直接复制 L0 第一个参考,
/// 没有参考时以中间灰度填充.
#[derive(Debug, Default)]
pub struct RawPayloadDecoder;

impl RawPayloadDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl PayloadDecoder for RawPayloadDecoder {
    fn name(&self) -> &str {
        "raw"
    }

    fn decode(
        &mut self,
        _segment: &SegmentHeader,
        pic: &PictureData,
        payload: &[u8],
        refs: &ReferencePictures<'_>,
        rec: &mut ReconstructedPicture,
    ) -> bool {
        if payload.is_empty() {
            let copied = refs
                .l0
                .first()
                .is_some_and(|reference| rec.copy_samples_from(reference));
            if !copied {
                rec.fill_mid_grey();
            }
            return true;
        }

        let format = rec.format();
        let bytes_per_sample = bytes_per_sample(format.bitdepth);
        let sample_bytes = format
            .chroma_format
            .total_samples(format.width, format.height)
            * bytes_per_sample;
        if payload.len() < sample_bytes + 2 {
            warn!(
                "载荷长度不足: poc={}, 需要 {} 字节, 实际 {} 字节",
                pic.poc,
                sample_bytes + 2,
                payload.len()
            );
            rec.fill_mid_grey();
            return false;
        }

        let (samples, tail) = payload.split_at(sample_bytes);
        let mut offset = 0;
        for plane in 0..rec.plane_count() {
            for sample in rec.plane_mut(plane) {
                *sample = if bytes_per_sample == 1 {
                    u16::from(samples[offset])
                } else {
                    u16::from_be_bytes([samples[offset], samples[offset + 1]])
                };
                offset += bytes_per_sample;
            }
        }

        let mut crc = Crc16::new();
        crc.update(samples);
        let expected = u16::from_be_bytes([tail[0], tail[1]]);
        if crc.value() != expected {
            warn!(
                "载荷校验失败: poc={}, 计算 {:#06x}, 码流 {:#06x}",
                pic.poc,
                crc.value(),
                expected
            );
            return false;
        }
        true
    }
}

/// 将重建图像编码为未压缩载荷 (含 CRC-16)
pub fn encode_raw_payload(rec: &ReconstructedPicture) -> Vec<u8> {
    let format = rec.format();
    let bytes_per_sample = bytes_per_sample(format.bitdepth);
    let mut out = Vec::with_capacity(
        format.chroma_format.total_samples(format.width, format.height) * bytes_per_sample + 2,
    );
    for plane in 0..rec.plane_count() {
        for &sample in rec.plane(plane) {
            if bytes_per_sample == 1 {
                out.push(sample as u8);
            } else {
                out.extend_from_slice(&sample.to_be_bytes());
            }
        }
    }
    let mut crc = Crc16::new();
    crc.update(&out);
    out.extend_from_slice(&crc.value().to_be_bytes());
    out
}

fn bytes_per_sample(bitdepth: u32) -> usize {
    if bitdepth > 8 { 2 } else { 1 }
}
