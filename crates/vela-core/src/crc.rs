//! CRC 校验和计算.
//!
//! 图像载荷末尾携带 CRC-16 (多项式 0x8005, 初始值 0), 解码后用于
//! 校验重建样本是否与编码端一致.

/// CRC-16 查找表 (多项式 0x8005)
const CRC16_TABLE: [u16; 256] = {
    let mut table = [0u16; 256];
    let mut i = 0u16;
    while i < 256 {
        let mut crc = i << 8;
        let mut j = 0;
        while j < 8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x8005;
            } else {
                crc <<= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

/// 增量 CRC-16 计算器
///
/// 样本平面分块送入时使用, 避免先拼接整帧数据.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc16 {
    value: u16,
}

impl Crc16 {
    /// 创建初始值为 0 的计算器
    pub fn new() -> Self {
        Self::default()
    }

    /// 送入一段数据
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.value = (self.value << 8) ^ CRC16_TABLE[((self.value >> 8) as u8 ^ byte) as usize];
        }
    }

    /// 当前校验值
    pub fn value(&self) -> u16 {
        self.value
    }
}
