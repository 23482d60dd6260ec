//! 图像头解析与 POC 推导.
//!
//! 图像头布局 (NAL 头之后):
//! `buffer_flag(1) tid(3) new_sub_gop_length_flag(1) [sub_gop_length(8)]
//! poc_offset(8) qp(7)`, 随后字节对齐, 剩余字节为载荷.
//!
//! tid 0 图像是 sub-GOP 的锚点, 它把 POC 窗口向前推进一个 sub-GOP 长度,
//! 自身 POC 为窗口终点; tid > 0 图像的 POC 为窗口起点加偏移.

use log::trace;
use vela_core::bitreader::BitReader;
use vela_core::{VelaError, VelaResult};

use crate::nal::NalHeader;
use crate::picture::{OutputStatus, PicNum, PictureData, PictureDecoder, SegmentNum};

/// 会话持有的 sub-GOP POC 窗口
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubGopWindow {
    /// 上一个锚点的 POC
    pub start_poc: PicNum,
    /// 当前锚点的 POC
    pub end_poc: PicNum,
    /// 当前 sub-GOP 长度
    pub length: PicNum,
}

impl SubGopWindow {
    /// 窗口前移一个 sub-GOP
    pub fn step_forward(&mut self) {
        self.start_poc = self.end_poc;
        self.end_poc += self.length;
    }
}

impl PictureDecoder {
    /// 解析图像头并推导 POC / DOC / SOC
    ///
    /// `br` 必须位于 NAL 单元起点. 成功返回后游标位于载荷起点 (字节对齐).
    /// 解析会复位槽位的输出状态, 参考列表和解码标记.
    pub fn decode_header(
        &mut self,
        br: &mut BitReader,
        window: &mut SubGopWindow,
        max_sub_gop_length: PicNum,
        doc: PicNum,
        soc: SegmentNum,
    ) -> VelaResult<()> {
        let nal_header = NalHeader::from_byte(br.read_byte()?);
        if !nal_header.nal_type.is_picture() {
            return Err(VelaError::InvalidData(format!(
                "NAL 类型 {:?} 不是图像",
                nal_header.nal_type
            )));
        }

        let buffer_flag = br.read_flag()?;
        let tid = br.read_bits(3)?;
        let new_sub_gop_length = if br.read_flag()? {
            Some(PicNum::from(br.read_bits(8)?))
        } else {
            None
        };
        let poc_offset = PicNum::from(br.read_bits(8)?);
        let qp = br.read_bits(7)? as i32;
        br.align_to_byte();

        if let Some(length) = new_sub_gop_length {
            if length == 0 || length > max_sub_gop_length {
                return Err(VelaError::InvalidData(format!(
                    "sub-GOP 长度 {} 超出段头上限 {}",
                    length, max_sub_gop_length
                )));
            }
            window.length = length;
        }

        let poc = if tid == 0 {
            if doc == 0 {
                window.start_poc = 0;
                window.end_poc = 0;
            } else {
                window.step_forward();
            }
            window.end_poc
        } else {
            window.start_poc + poc_offset
        };

        let data = self.pic_data_mut();
        *data = PictureData {
            nal_type: nal_header.nal_type,
            poc,
            doc,
            soc: if buffer_flag { soc.saturating_sub(1) } else { soc },
            tid,
            qp,
            output_status: OutputStatus::HasNotBeenOutput,
            decoded: false,
            ..PictureData::default()
        };
        trace!(
            "图像头: type={:?}, tid={}, poc={}, doc={}, soc={}, tail={}",
            data.nal_type, tid, poc, doc, data.soc, buffer_flag
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nal::{NalUnitType, PictureUnitBuilder};
    use crate::picture::PictureFormat;

    fn decode(
        pic: &mut PictureDecoder,
        unit: &[u8],
        window: &mut SubGopWindow,
        doc: PicNum,
    ) -> VelaResult<()> {
        let mut br = BitReader::new(unit);
        pic.decode_header(&mut br, window, 8, doc, 1)
    }

    #[test]
    fn test_图像头_poc_推导() {
        let mut pic = PictureDecoder::new(PictureFormat::default());
        let mut window = SubGopWindow {
            length: 4,
            ..Default::default()
        };

        let intra = PictureUnitBuilder::new(NalUnitType::IntraPicture).build();
        decode(&mut pic, &intra, &mut window, 0).unwrap();
        assert_eq!(pic.pic_data().poc, 0);
        assert_eq!((window.start_poc, window.end_poc), (0, 0));

        let anchor = PictureUnitBuilder::new(NalUnitType::PredictedPicture).build();
        decode(&mut pic, &anchor, &mut window, 1).unwrap();
        assert_eq!(pic.pic_data().poc, 4);
        assert_eq!((window.start_poc, window.end_poc), (0, 4));

        let b = PictureUnitBuilder::new(NalUnitType::BipredictedPicture)
            .tid(1)
            .poc_offset(2)
            .build();
        decode(&mut pic, &b, &mut window, 2).unwrap();
        assert_eq!(pic.pic_data().poc, 2);
        assert_eq!(pic.pic_data().doc, 2);
        assert_eq!(pic.pic_data().tid, 1);
        assert_eq!(pic.pic_data().output_status, OutputStatus::HasNotBeenOutput);
    }

    #[test]
    fn test_图像头_新_sub_gop_长度() {
        let mut pic = PictureDecoder::new(PictureFormat::default());
        let mut window = SubGopWindow {
            start_poc: 0,
            end_poc: 8,
            length: 8,
        };
        let unit = PictureUnitBuilder::new(NalUnitType::PredictedPicture)
            .sub_gop_length(2)
            .qp(40)
            .payload(vec![1, 2, 3])
            .build();
        let mut br = BitReader::new(&unit);
        pic.decode_header(&mut br, &mut window, 8, 5, 1).unwrap();
        assert_eq!(window.length, 2);
        assert_eq!(pic.pic_data().poc, 10);
        assert_eq!(pic.pic_data().qp, 40);
        assert_eq!(br.remaining_bytes(), &[1, 2, 3]);

        let too_long = PictureUnitBuilder::new(NalUnitType::PredictedPicture)
            .sub_gop_length(9)
            .build();
        assert!(decode(&mut pic, &too_long, &mut window, 6).is_err());
    }

    #[test]
    fn test_图像头_尾部图像_soc() {
        let mut pic = PictureDecoder::new(PictureFormat::default());
        let mut window = SubGopWindow {
            length: 4,
            ..Default::default()
        };
        let tail = PictureUnitBuilder::new(NalUnitType::BipredictedPicture)
            .buffer_flag(true)
            .tid(2)
            .poc_offset(1)
            .build();
        let mut br = BitReader::new(&tail);
        pic.decode_header(&mut br, &mut window, 4, 3, 2).unwrap();
        assert_eq!(pic.pic_data().soc, 1);
    }

    #[test]
    fn test_图像头_截断() {
        let mut pic = PictureDecoder::new(PictureFormat::default());
        let mut window = SubGopWindow::default();
        assert!(decode(&mut pic, &[0x00, 0x00], &mut window, 0).is_err());
        let header = [NalHeader::from(NalUnitType::SegmentHeader).to_byte(), 0, 0, 0];
        assert!(decode(&mut pic, &header, &mut window, 0).is_err());
    }
}
