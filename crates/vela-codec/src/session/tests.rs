use super::*;
use crate::nal::{NalHeader, NalUnitType, PictureUnitBuilder};
use crate::payload::encode_raw_payload;
use crate::picture::{PictureFormat, ReconstructedPicture};

const FORMAT: PictureFormat = PictureFormat {
    chroma_format: ChromaFormat::Yuv420,
    width: 4,
    height: 2,
    bitdepth: 8,
};

fn segment_header(sub_gop: PicNum, open_gop: bool, num_ref_pics: u32) -> SegmentHeader {
    SegmentHeader {
        pic_width: FORMAT.width,
        pic_height: FORMAT.height,
        chroma_format: FORMAT.chroma_format,
        color_matrix: ColorMatrix::Bt709,
        internal_bitdepth: FORMAT.bitdepth,
        bitstream_ticks: 3000,
        max_sub_gop_length: sub_gop,
        open_gop,
        num_ref_pics,
        ..SegmentHeader::default()
    }
}

fn segment(sub_gop: PicNum, open_gop: bool, num_ref_pics: u32) -> Vec<u8> {
    segment_header(sub_gop, open_gop, num_ref_pics).to_nal_unit()
}

fn payload(fill: u16) -> Vec<u8> {
    let mut rec = ReconstructedPicture::new(FORMAT);
    rec.fill(fill);
    encode_raw_payload(&rec)
}

fn picture(nal_type: NalUnitType, tid: u8, poc_offset: u8) -> Vec<u8> {
    PictureUnitBuilder::new(nal_type)
        .tid(tid)
        .poc_offset(poc_offset)
        .payload(payload(u16::from(poc_offset) + 16))
        .build()
}

fn tail(tid: u8, poc_offset: u8) -> Vec<u8> {
    PictureUnitBuilder::new(NalUnitType::BipredictedPicture)
        .buffer_flag(true)
        .tid(tid)
        .poc_offset(poc_offset)
        .payload(payload(u16::from(poc_offset) + 16))
        .build()
}

fn drain(decoder: &mut SegmentDecoder) -> Vec<DecodedPicture> {
    let mut out = Vec::new();
    while let Some(picture) = decoder.get_decoded_picture() {
        out.push(picture);
    }
    out
}

fn pocs(pictures: &[DecodedPicture]) -> Vec<u32> {
    pictures.iter().map(|p| p.stats.poc).collect()
}

fn new_decoder() -> SegmentDecoder {
    SegmentDecoder::new(DecoderConfig::default())
}

#[test]
fn test_会话_无段头拒绝图像() {
    let mut decoder = new_decoder();
    assert!(!decoder.decode_nal(&picture(NalUnitType::IntraPicture, 0, 0)));
    assert!(!decoder.decode_nal(&[]));
    assert_eq!(decoder.state(), DecoderState::NoSegmentHeader);
    assert_eq!(decoder.num_pics_in_flight(), 0);
}

#[test]
fn test_会话_忽略扩展单元() {
    let mut decoder = new_decoder();
    let mut unit = segment(4, false, 2);
    unit[0] |= 0x40;
    assert!(!decoder.decode_nal(&unit));
    assert_eq!(decoder.state(), DecoderState::NoSegmentHeader);
    assert_eq!(decoder.soc(), 0);
}

#[test]
fn test_会话_非图像单元() {
    let mut decoder = new_decoder();
    assert!(decoder.decode_nal(&segment(4, false, 2)));
    let sei = [NalHeader::from(NalUnitType::SeiPrefix).to_byte(), 0x00];
    assert!(!decoder.decode_nal(&sei));
    assert_eq!(decoder.num_pics_in_flight(), 0);
}

#[test]
fn test_会话_版本过高后恢复() {
    let mut decoder = new_decoder();
    let too_new = SegmentHeader {
        version_major: 2,
        ..segment_header(4, false, 2)
    };
    assert!(!decoder.decode_nal(&too_new.to_nal_unit()));
    assert_eq!(decoder.state(), DecoderState::DecoderVersionTooLow);
    assert!(!decoder.decode_nal(&picture(NalUnitType::IntraPicture, 0, 0)));

    let too_deep = SegmentHeader {
        internal_bitdepth: 18,
        ..segment_header(4, false, 2)
    };
    assert!(!decoder.decode_nal(&too_deep.to_nal_unit()));
    assert_eq!(decoder.state(), DecoderState::BitstreamBitdepthTooHigh);

    assert!(decoder.decode_nal(&segment(4, false, 2)));
    assert_eq!(decoder.state(), DecoderState::SegmentHeaderDecoded);
    assert_eq!(decoder.soc(), 3);
    assert!(decoder.decode_nal(&picture(NalUnitType::IntraPicture, 0, 0)));
    assert_eq!(decoder.state(), DecoderState::PicDecoded);
}

#[test]
fn test_会话_段头截断() {
    let mut decoder = new_decoder();
    let unit = segment(4, false, 2);
    assert!(!decoder.decode_nal(&unit[..5]));
    assert_eq!(decoder.state(), DecoderState::NoSegmentHeader);
    assert_eq!(decoder.soc(), 1);
}

#[test]
fn test_会话_图像池大小只增不减() {
    let mut decoder = new_decoder();
    decoder.decode_nal(&segment(8, false, 4));
    assert_eq!(decoder.pic_buffering_num(), 13);
    decoder.decode_nal(&segment(2, false, 1));
    assert_eq!(decoder.pic_buffering_num(), 13);
    decoder.decode_nal(&segment(16, false, 1));
    assert_eq!(decoder.pic_buffering_num(), 18);
}

#[test]
fn test_会话_封闭gop_四幅图像() {
    let mut decoder = new_decoder();
    assert!(decoder.decode_nal(&segment(4, false, 2)));
    assert_eq!(decoder.pic_buffering_num(), 7);

    assert!(decoder.decode_nal(&picture(NalUnitType::IntraPicture, 0, 0)));
    assert!(decoder.decode_nal(&picture(NalUnitType::PredictedPicture, 0, 0)));
    assert!(decoder.decode_nal(&picture(NalUnitType::BipredictedPicture, 1, 2)));
    assert!(decoder.decode_nal(&picture(NalUnitType::BipredictedPicture, 2, 1)));
    assert_eq!(decoder.num_buffered_nals(), 0);
    assert_eq!(decoder.num_pics_in_flight(), 4);
    assert_eq!(decoder.next_doc(), 4);

    // 图像池未填满前不输出
    assert!(decoder.get_decoded_picture().is_none());

    decoder.flush_buffered_tail_pics();
    let out = drain(&mut decoder);
    assert_eq!(pocs(&out), vec![0, 1, 2, 4]);
    assert_eq!(decoder.num_pics_in_flight(), 0);
    assert_eq!(decoder.num_corrupted_pics(), 0);

    let b = &out[1].stats;
    assert_eq!(b.tid, 2);
    assert_eq!(b.doc, 3);
    assert_eq!(b.soc, 1);
    assert_eq!(b.l0, [0, -1, -1, -1, -1]);
    assert_eq!(b.l1, [2, 4, -1, -1, -1]);
    assert_eq!(b.framerate, 30.0);
    assert_eq!(b.color_matrix, ColorMatrix::Bt709);
    assert_eq!(out[1].bytes.len(), 12);
    assert!(out[1].bytes.iter().all(|&s| s == 17));
}

#[test]
fn test_会话_段头丢弃未解码单元() {
    let mut decoder = new_decoder();
    decoder.decode_nal(&segment(1, false, 0));
    assert_eq!(decoder.pic_buffering_num(), 2);
    decoder.decode_nal(&picture(NalUnitType::IntraPicture, 0, 0));
    decoder.decode_nal(&picture(NalUnitType::PredictedPicture, 0, 0));
    assert_eq!(decoder.num_buffered_nals(), 1);
    assert_eq!(decoder.num_pics_in_flight(), 2);

    assert!(decoder.decode_nal(&segment(1, false, 0)));
    assert_eq!(decoder.num_buffered_nals(), 0);
    assert_eq!(decoder.num_pics_in_flight(), 1);
    assert_eq!(decoder.num_tail_pics(), 0);
}

#[test]
fn test_会话_输出后继续解码缓冲() {
    let mut decoder = new_decoder();
    decoder.decode_nal(&segment(1, false, 0));
    decoder.decode_nal(&picture(NalUnitType::IntraPicture, 0, 0));
    decoder.decode_nal(&picture(NalUnitType::PredictedPicture, 0, 0));
    decoder.decode_nal(&picture(NalUnitType::PredictedPicture, 0, 0));
    assert_eq!(decoder.num_buffered_nals(), 2);

    let first = decoder.get_decoded_picture().unwrap();
    assert_eq!(first.stats.poc, 0);
    assert_eq!(decoder.num_buffered_nals(), 1);
    let second = decoder.get_decoded_picture().unwrap();
    assert_eq!(second.stats.poc, 1);
    assert_eq!(decoder.num_buffered_nals(), 0);
    // 缓冲清空后图像池不满, 等待更多输入
    assert!(decoder.get_decoded_picture().is_none());
}

#[test]
fn test_会话_封闭gop_尾部图像跨段() {
    let mut decoder = new_decoder();
    decoder.decode_nal(&segment(2, false, 1));
    decoder.decode_nal(&picture(NalUnitType::IntraPicture, 0, 0));
    assert!(decoder.decode_nal(&tail(1, 1)));
    assert_eq!(decoder.num_tail_pics(), 1);
    assert_eq!(decoder.num_buffered_nals(), 1);

    // 只有尾部图像在缓冲中, 段头不丢弃它们
    assert!(decoder.decode_nal(&segment(2, false, 1)));
    assert_eq!(decoder.num_buffered_nals(), 1);
    assert_eq!(decoder.num_tail_pics(), 1);

    // 新段的锚点插入队首, 先于尾部图像解码
    assert!(decoder.decode_nal(&picture(NalUnitType::PredictedPicture, 0, 0)));
    assert_eq!(decoder.num_buffered_nals(), 0);
    assert_eq!(decoder.num_tail_pics(), 0);

    decoder.flush_buffered_tail_pics();
    let out = drain(&mut decoder);
    assert_eq!(pocs(&out), vec![0, 1, 2]);
    let tail_stats = &out[1].stats;
    assert_eq!(tail_stats.soc, 1);
    assert_eq!(tail_stats.doc, 2);
    assert_eq!(tail_stats.l0, [0, -1, -1, -1, -1]);
    assert_eq!(tail_stats.l1, [-1; 5]);
    assert_eq!(out[2].stats.soc, 2);
    assert_eq!(out[2].stats.doc, 1);
}

#[test]
fn test_会话_封闭gop_刷新尾部图像() {
    let mut decoder = new_decoder();
    decoder.decode_nal(&segment(4, false, 1));
    decoder.decode_nal(&picture(NalUnitType::IntraPicture, 0, 0));
    assert_eq!(decoder.next_doc(), 1);
    decoder.decode_nal(&tail(1, 2));
    decoder.decode_nal(&tail(2, 1));

    decoder.flush_buffered_tail_pics();
    // 跳过缺失的锚点: 1 + 2 个尾部图像 + 1
    assert_eq!(decoder.next_doc(), 4);
    assert_eq!(decoder.num_tail_pics(), 0);

    decoder.decode_nal(&segment(4, false, 1));
    decoder.decode_nal(&picture(NalUnitType::PredictedPicture, 0, 0));
    decoder.decode_nal(&picture(NalUnitType::PredictedPicture, 0, 0));
    decoder.flush_buffered_tail_pics();
    assert_eq!(decoder.next_doc(), 6);

    let out = drain(&mut decoder);
    assert_eq!(pocs(&out), vec![0, 1, 2, 8, 12]);
}

#[test]
fn test_会话_开放gop_刷新丢弃尾部() {
    let mut decoder = new_decoder();
    decoder.decode_nal(&segment(4, true, 2));
    decoder.decode_nal(&picture(NalUnitType::IntraPicture, 0, 0));
    decoder.decode_nal(&tail(1, 2));
    decoder.decode_nal(&tail(2, 1));
    assert_eq!(decoder.num_pics_in_flight(), 3);

    decoder.flush_buffered_tail_pics();
    assert_eq!(decoder.num_buffered_nals(), 0);
    assert_eq!(decoder.num_tail_pics(), 0);
    assert_eq!(decoder.num_pics_in_flight(), 1);
    assert_eq!(decoder.next_doc(), 1);
    assert_eq!(pocs(&drain(&mut decoder)), vec![0]);
}

#[test]
fn test_会话_开放gop_尾部图像跨段后刷新() {
    let mut decoder = new_decoder();
    decoder.decode_nal(&segment(4, true, 2));
    decoder.decode_nal(&picture(NalUnitType::IntraPicture, 0, 0));
    decoder.decode_nal(&tail(1, 2));
    decoder.decode_nal(&tail(2, 1));

    assert!(decoder.decode_nal(&segment(4, true, 2)));
    assert_eq!(decoder.num_tail_pics(), 2);
    assert_eq!(decoder.next_doc(), 1);

    decoder.flush_buffered_tail_pics();
    assert_eq!(decoder.num_tail_pics(), 0);
    assert_eq!(decoder.num_buffered_nals(), 0);
    assert_eq!(decoder.next_doc(), 1);
}

#[test]
fn test_会话_校验失败状态保持() {
    let mut decoder = new_decoder();
    decoder.decode_nal(&segment(4, false, 2));
    decoder.decode_nal(&picture(NalUnitType::IntraPicture, 0, 0));

    let mut corrupted = picture(NalUnitType::PredictedPicture, 0, 0);
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0x5A;
    assert!(decoder.decode_nal(&corrupted));
    assert_eq!(decoder.state(), DecoderState::ChecksumMismatch);
    assert_eq!(decoder.num_corrupted_pics(), 1);

    decoder.decode_nal(&picture(NalUnitType::BipredictedPicture, 1, 2));
    assert_eq!(decoder.state(), DecoderState::ChecksumMismatch);

    decoder.flush_buffered_tail_pics();
    let out = drain(&mut decoder);
    assert_eq!(pocs(&out), vec![0, 2, 4]);
    assert!(out[2].stats.corrupted);
    assert!(!out[1].stats.corrupted);

    decoder.decode_nal(&segment(4, false, 2));
    assert_eq!(decoder.state(), DecoderState::SegmentHeaderDecoded);
    assert_eq!(decoder.num_corrupted_pics(), 1);
}

#[test]
fn test_会话_图像头错误() {
    let mut decoder = new_decoder();
    decoder.decode_nal(&segment(4, false, 2));
    decoder.decode_nal(&picture(NalUnitType::IntraPicture, 0, 0));
    let bad = PictureUnitBuilder::new(NalUnitType::PredictedPicture)
        .sub_gop_length(9)
        .build();
    assert!(decoder.decode_nal(&bad));
    assert_eq!(decoder.state(), DecoderState::ChecksumMismatch);
    assert_eq!(decoder.num_corrupted_pics(), 1);
    assert_eq!(decoder.num_pics_in_flight(), 1);
    assert_eq!(decoder.next_doc(), 1);
}

#[test]
fn test_会话_时间层降采样() {
    let config = DecoderConfig::builder().decoder_ticks(6000).build().unwrap();
    let mut decoder = SegmentDecoder::new(config);
    decoder.decode_nal(&segment(4, false, 2));
    assert_eq!(decoder.max_tid(), Some(1));

    decoder.decode_nal(&picture(NalUnitType::IntraPicture, 0, 0));
    decoder.decode_nal(&picture(NalUnitType::PredictedPicture, 0, 0));
    decoder.decode_nal(&picture(NalUnitType::BipredictedPicture, 1, 2));
    // tid 2 被丢弃但不算错误
    assert!(decoder.decode_nal(&picture(NalUnitType::BipredictedPicture, 2, 1)));
    assert_eq!(decoder.num_pics_in_flight(), 3);

    decoder.flush_buffered_tail_pics();
    let out = drain(&mut decoder);
    assert_eq!(pocs(&out), vec![0, 2, 4]);
    assert_eq!(out[0].stats.framerate, 15.0);
    assert_eq!(out[0].stats.bitstream_framerate, 30.0);
}

#[test]
fn test_会话_帧率按最大sub_gop计算() {
    let mut decoder = new_decoder();
    decoder.decode_nal(&segment(8, false, 0));
    decoder.decode_nal(&segment(2, false, 0));
    assert_eq!(decoder.pic_buffering_num(), 9);
    assert_eq!(decoder.max_tid(), Some(1));

    decoder.decode_nal(&picture(NalUnitType::IntraPicture, 0, 0));
    decoder.flush_buffered_tail_pics();
    let out = drain(&mut decoder);
    assert_eq!(pocs(&out), vec![0]);
    // 时间层 0..=1, 窗口中最大 sub-GOP 为 8 (3 层): 30 / 4
    assert_eq!(out[0].stats.framerate, 7.5);
    assert_eq!(out[0].stats.bitstream_framerate, 30.0);
}

#[test]
fn test_会话_格式变化回收槽位() {
    const DEEP: PictureFormat = PictureFormat {
        bitdepth: 10,
        ..FORMAT
    };
    let deep_anchor = || {
        let mut rec = ReconstructedPicture::new(DEEP);
        rec.fill(400);
        PictureUnitBuilder::new(NalUnitType::PredictedPicture)
            .payload(encode_raw_payload(&rec))
            .build()
    };

    let mut decoder = new_decoder();
    let mut out = Vec::new();
    decoder.decode_nal(&segment(1, false, 0));
    for nal_type in [
        NalUnitType::IntraPicture,
        NalUnitType::PredictedPicture,
        NalUnitType::PredictedPicture,
    ] {
        assert!(decoder.decode_nal(&picture(nal_type, 0, 0)));
        out.extend(drain(&mut decoder));
    }
    assert_eq!(decoder.pool.len(), 2);

    let deep = SegmentHeader {
        internal_bitdepth: 10,
        ..segment_header(1, false, 0)
    };
    assert!(decoder.decode_nal(&deep.to_nal_unit()));
    assert_eq!(decoder.pic_buffering_num(), 2);
    for _ in 0..2 {
        assert!(decoder.decode_nal(&deep_anchor()));
        out.extend(drain(&mut decoder));
    }
    decoder.flush_buffered_tail_pics();
    out.extend(drain(&mut decoder));

    // 池大小不变, 两个槽位都已被回收并替换为新格式
    assert_eq!(decoder.pool.len(), 2);
    assert!(decoder.pool.slots().iter().all(|pic| pic.format() == DEEP));
    assert_eq!(pocs(&out), vec![0, 1, 2, 3, 4]);
    assert_eq!(decoder.num_corrupted_pics(), 0);

    // 输出格式保持第一个段头的 8 位: (400 + 2) >> 2 = 100
    for picture in &out {
        let expected = if picture.stats.poc < 3 { 16 } else { 100 };
        assert_eq!(picture.bytes.len(), 12);
        assert!(picture.bytes.iter().all(|&s| s == expected));
    }
    assert_eq!(out[3].stats.bitstream_bitdepth, 10);
    assert_eq!(out[3].stats.bitdepth, 8);
}

#[test]
fn test_会话_固定输出格式() {
    let config = DecoderConfig::builder()
        .output_size(2, 1)
        .output_chroma_format(ChromaFormat::Monochrome)
        .output_bitdepth(10)
        .build()
        .unwrap();
    let mut decoder = SegmentDecoder::new(config);
    decoder.decode_nal(&segment(1, false, 0));
    decoder.decode_nal(&picture(NalUnitType::IntraPicture, 0, 0));
    decoder.flush_buffered_tail_pics();

    let picture = decoder.get_decoded_picture().unwrap();
    assert_eq!(picture.stats.width, 2);
    assert_eq!(picture.stats.bitdepth, 10);
    assert_eq!(picture.stats.bitstream_bitdepth, 8);
    // 16 << 2 = 64, 小端
    assert_eq!(picture.bytes, vec![64, 0, 64, 0]);
}

#[test]
fn test_会话_关闭图像池等待() {
    let config = DecoderConfig::builder()
        .enforce_sliding_window(false)
        .build()
        .unwrap();
    let mut decoder = SegmentDecoder::new(config);
    decoder.decode_nal(&segment(4, false, 2));
    decoder.decode_nal(&picture(NalUnitType::IntraPicture, 0, 0));
    let picture = decoder.get_decoded_picture().unwrap();
    assert_eq!(picture.stats.poc, 0);
    assert!(decoder.get_decoded_picture().is_none());
}

#[test]
fn test_会话_框架接口() {
    let mut decoder = new_decoder();
    assert_eq!(decoder.name(), "vela");
    decoder
        .send_packet(&Packet::from_data(segment(2, false, 1)))
        .unwrap();
    decoder
        .send_packet(&Packet::from_data(picture(NalUnitType::IntraPicture, 0, 0)))
        .unwrap();
    decoder
        .send_packet(&Packet::from_data(picture(NalUnitType::PredictedPicture, 0, 0)))
        .unwrap();
    assert!(matches!(
        decoder.receive_frame(),
        Err(VelaError::NeedMoreData)
    ));

    decoder.send_packet(&Packet::empty()).unwrap();
    assert_eq!(decoder.receive_frame().unwrap().stats.poc, 0);
    assert_eq!(decoder.receive_frame().unwrap().stats.poc, 2);
    assert!(matches!(decoder.receive_frame(), Err(VelaError::Eof)));

    Decoder::flush(&mut decoder);
    assert_eq!(decoder.state(), DecoderState::NoSegmentHeader);
    assert_eq!(decoder.pool.len(), 0);
}
