//! 长度前缀 NAL 单元文件读写.
//!
//! 文件格式: 每个 NAL 单元前置 4 字节大端长度.

use std::io::{self, Read, Write};

use anyhow::{Context, Result, bail};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

/// 单个 NAL 单元长度上限
pub const MAX_NAL_UNIT_SIZE: u32 = 64 << 20;

/// 长度前缀 NAL 单元读取器
pub struct NalUnitReader<R> {
    inner: R,
    /// 已读取的字节数
    offset: u64,
}

impl<R: Read> NalUnitReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// 当前单元在文件中的偏移量
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// 读取下一个 NAL 单元, 文件结束时返回 `None`
    pub fn next_unit(&mut self) -> Result<Option<Vec<u8>>> {
        let size = match self.inner.read_u32::<BigEndian>() {
            Ok(size) => size,
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(err) => return Err(err).context("读取 NAL 单元长度失败"),
        };
        if size > MAX_NAL_UNIT_SIZE {
            bail!("NAL 单元长度 {} 超过上限 (偏移 {})", size, self.offset);
        }
        let mut unit = vec![0u8; size as usize];
        self.inner
            .read_exact(&mut unit)
            .with_context(|| format!("NAL 单元数据截断 (偏移 {}, 长度 {})", self.offset, size))?;
        self.offset += 4 + u64::from(size);
        Ok(Some(unit))
    }
}

/// 写入一个带长度前缀的 NAL 单元
pub fn write_nal_unit<W: Write>(writer: &mut W, unit: &[u8]) -> Result<()> {
    let size = u32::try_from(unit.len()).context("NAL 单元过长")?;
    writer.write_u32::<BigEndian>(size)?;
    writer.write_all(unit)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::{BufReader, BufWriter};

    #[test]
    fn test_长度前缀_文件读写() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.vela");
        {
            let mut writer = BufWriter::new(File::create(&path).unwrap());
            write_nal_unit(&mut writer, &[0x20, 1, 2, 3]).unwrap();
            write_nal_unit(&mut writer, &[]).unwrap();
            write_nal_unit(&mut writer, &[0x02]).unwrap();
        }

        let mut reader = NalUnitReader::new(BufReader::new(File::open(&path).unwrap()));
        assert_eq!(reader.next_unit().unwrap(), Some(vec![0x20, 1, 2, 3]));
        assert_eq!(reader.offset(), 8);
        assert_eq!(reader.next_unit().unwrap(), Some(Vec::new()));
        assert_eq!(reader.next_unit().unwrap(), Some(vec![0x02]));
        assert_eq!(reader.next_unit().unwrap(), None);
    }

    #[test]
    fn test_长度前缀_数据截断() {
        let data = [0u8, 0, 0, 8, 1, 2];
        let mut reader = NalUnitReader::new(&data[..]);
        assert!(reader.next_unit().is_err());

        let huge = (MAX_NAL_UNIT_SIZE + 1).to_be_bytes();
        let mut reader = NalUnitReader::new(&huge[..]);
        assert!(reader.next_unit().is_err());
    }
}
