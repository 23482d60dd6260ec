//! 比特流读取器.
//!
//! 按大端位序 (MSB first) 顺序读取 NAL 单元中的各字段.
//! 除常规读取外还支持回退 N 位 (`rewind`), 用于分发阶段"窥视"图像头部后
//! 把游标还给真正的图像头解析步骤.

use crate::{VelaError, VelaResult};

/// 比特流读取器
///
/// # 示例
/// ```
/// use vela_core::bitreader::BitReader;
///
/// let data = [0b1011_0001, 0b0101_0101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4).unwrap(), 0b1011);
/// br.rewind(4).unwrap();
/// assert_eq!(br.read_byte().unwrap(), 0b1011_0001);
/// ```
pub struct BitReader<'a> {
    data: &'a [u8],
    /// 已消费的总位数
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// 获取已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.pos
    }

    /// 获取剩余可读位数
    pub fn bits_left(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.pos)
    }

    /// 读取 1 个位
    pub fn read_bit(&mut self) -> VelaResult<u32> {
        if self.bits_left() == 0 {
            return Err(VelaError::Eof);
        }
        let byte = self.data[self.pos / 8];
        let bit = (byte >> (7 - (self.pos % 8))) & 1;
        self.pos += 1;
        Ok(u32::from(bit))
    }

    /// 读取 1 个位并转换为布尔值
    pub fn read_flag(&mut self) -> VelaResult<bool> {
        Ok(self.read_bit()? == 1)
    }

    /// 读取 N 个位 (最多 32 位)
    ///
    /// 按大端位序读取, 返回值的低 N 位有效.
    pub fn read_bits(&mut self, n: u32) -> VelaResult<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(VelaError::InvalidArgument(format!(
                "read_bits: n={} 超过 32 位",
                n,
            )));
        }
        if (n as usize) > self.bits_left() {
            return Err(VelaError::Eof);
        }

        let mut result: u32 = 0;
        let mut remaining = n;
        while remaining > 0 {
            let bit_pos = (self.pos % 8) as u32;
            let available = 8 - bit_pos;
            let to_read = remaining.min(available);

            let shift = available - to_read;
            let mask = ((1u32 << to_read) - 1) as u8;
            let bits = (self.data[self.pos / 8] >> shift) & mask;

            result = (result << to_read) | u32::from(bits);
            self.pos += to_read as usize;
            remaining -= to_read;
        }
        Ok(result)
    }

    /// 读取一个完整字节 (不要求字节对齐)
    pub fn read_byte(&mut self) -> VelaResult<u8> {
        Ok(self.read_bits(8)? as u8)
    }

    /// 读取有符号整数 (二进制补码)
    pub fn read_bits_signed(&mut self, n: u32) -> VelaResult<i32> {
        let val = self.read_bits(n)?;
        if n == 0 {
            return Ok(0);
        }
        if n >= 32 {
            return Ok(val as i32);
        }
        if (val >> (n - 1)) & 1 != 0 {
            Ok(val as i32 | !((1i32 << n) - 1))
        } else {
            Ok(val as i32)
        }
    }

    /// 回退 N 个位
    ///
    /// 回退量超过已读取位数时返回错误, 游标保持不变.
    pub fn rewind(&mut self, n: u32) -> VelaResult<()> {
        let n = n as usize;
        if n > self.pos {
            return Err(VelaError::InvalidArgument(format!(
                "rewind: 回退 {} 位超过已读取的 {} 位",
                n, self.pos
            )));
        }
        self.pos -= n;
        Ok(())
    }

    /// 对齐到下一个字节边界
    ///
    /// 如果当前已在字节边界, 则不做任何事.
    pub fn align_to_byte(&mut self) {
        self.pos = self.pos.div_ceil(8) * 8;
    }

    /// 当前位置 (向上对齐到字节) 之后的全部剩余字节
    pub fn remaining_bytes(&self) -> &'a [u8] {
        let start = self.pos.div_ceil(8).min(self.data.len());
        &self.data[start..]
    }
}
