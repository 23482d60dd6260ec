//! 重建图像到输出缓冲的格式转换.
//!
//! 尺寸与色度格式按最近邻重采样, 位深按移位转换.
//! 色彩矩阵只作为元数据透传, 样本值不做矩阵变换.

use vela_core::ChromaFormat;

use crate::picture::{ReconstructedPicture, mid_grey};

/// 输出缓冲格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub width: u32,
    pub height: u32,
    pub chroma_format: ChromaFormat,
    pub bitdepth: u32,
}

impl OutputFormat {
    /// 每个样本占用的字节数
    pub fn bytes_per_sample(&self) -> usize {
        if self.bitdepth > 8 { 2 } else { 1 }
    }

    /// 整帧输出字节数
    pub fn frame_size(&self) -> usize {
        self.chroma_format.total_samples(self.width, self.height) * self.bytes_per_sample()
    }
}

impl ReconstructedPicture {
    /// 转换为输出格式并写入 `out` (覆盖原有内容)
    ///
    /// 位深 <= 8 时每样本 1 字节, 否则 2 字节小端.
    pub fn copy_to(&self, out: &mut Vec<u8>, target: &OutputFormat) {
        out.clear();
        out.reserve(target.frame_size());

        let src = self.format();
        let src_planes = self.plane_count();

        for plane in 0..target.chroma_format.plane_count() {
            let dst_w = target.chroma_format.plane_width(plane, target.width);
            let dst_h = target.chroma_format.plane_height(plane, target.height);

            if plane >= src_planes {
                // 单色源图像输出为彩色格式时色度取中间灰度
                let grey = mid_grey(target.bitdepth);
                for _ in 0..dst_w * dst_h {
                    push_sample(out, grey, target.bitdepth);
                }
                continue;
            }

            let samples = self.plane(plane);
            let src_w = src.chroma_format.plane_width(plane, src.width);
            let src_h = src.chroma_format.plane_height(plane, src.height);
            for y in 0..dst_h {
                let sy = y * src_h / dst_h;
                let row = &samples[sy * src_w..(sy + 1) * src_w];
                for x in 0..dst_w {
                    let sx = x * src_w / dst_w;
                    let value = shift_bitdepth(row[sx], src.bitdepth, target.bitdepth);
                    push_sample(out, value, target.bitdepth);
                }
            }
        }
    }
}

fn shift_bitdepth(sample: u16, from: u32, to: u32) -> u16 {
    let max = (1u32 << to) - 1;
    let value = if to > from {
        u32::from(sample) << (to - from)
    } else if from > to {
        let shift = from - to;
        (u32::from(sample) + (1 << (shift - 1))) >> shift
    } else {
        u32::from(sample)
    };
    value.min(max) as u16
}

fn push_sample(out: &mut Vec<u8>, value: u16, bitdepth: u32) {
    if bitdepth > 8 {
        out.extend_from_slice(&value.to_le_bytes());
    } else {
        out.push(value as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picture::PictureFormat;

    fn source(chroma_format: ChromaFormat, bitdepth: u32) -> ReconstructedPicture {
        let mut rec = ReconstructedPicture::new(PictureFormat {
            chroma_format,
            width: 4,
            height: 2,
            bitdepth,
        });
        for plane in 0..rec.plane_count() {
            for (i, sample) in rec.plane_mut(plane).iter_mut().enumerate() {
                *sample = (plane * 16 + i) as u16;
            }
        }
        rec
    }

    #[test]
    fn test_转换_同格式() {
        let rec = source(ChromaFormat::Yuv420, 8);
        let target = OutputFormat {
            width: 4,
            height: 2,
            chroma_format: ChromaFormat::Yuv420,
            bitdepth: 8,
        };
        let mut out = Vec::new();
        rec.copy_to(&mut out, &target);
        assert_eq!(out.len(), target.frame_size());
        assert_eq!(&out[..8], &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(&out[8..10], &[16, 17]);
        assert_eq!(&out[10..12], &[32, 33]);
    }

    #[test]
    fn test_转换_位深() {
        let rec = source(ChromaFormat::Monochrome, 8);
        let target = OutputFormat {
            width: 4,
            height: 2,
            chroma_format: ChromaFormat::Monochrome,
            bitdepth: 10,
        };
        let mut out = vec![0xAA; 3];
        rec.copy_to(&mut out, &target);
        assert_eq!(out.len(), 16);
        // 样本 1 << 2 = 4, 小端
        assert_eq!(&out[2..4], &[4, 0]);

        assert_eq!(shift_bitdepth(1023, 10, 8), 255);
        assert_eq!(shift_bitdepth(514, 10, 8), 129);
    }

    #[test]
    fn test_转换_缩放与色度() {
        let rec = source(ChromaFormat::Monochrome, 8);
        let target = OutputFormat {
            width: 2,
            height: 1,
            chroma_format: ChromaFormat::Yuv444,
            bitdepth: 8,
        };
        let mut out = Vec::new();
        rec.copy_to(&mut out, &target);
        assert_eq!(out, vec![0, 2, 128, 128, 128, 128]);
    }
}
