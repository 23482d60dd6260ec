//! 色度子采样格式定义.
//!
//! 段头中以 4 位编码携带, 同时决定每个图像的平面数量与各平面尺寸.

use std::fmt;

/// 色度子采样格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChromaFormat {
    /// 仅亮度平面
    Monochrome,
    /// 4:2:0, 色度宽高各减半
    Yuv420,
    /// 4:2:2, 色度宽度减半
    Yuv422,
    /// 4:4:4, 无色度子采样
    Yuv444,
    /// 未指定 (输出格式未固定时使用)
    #[default]
    Undefined,
}

impl ChromaFormat {
    /// 从码流中的 4 位编码创建, 未知编码返回 `None`
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Monochrome),
            1 => Some(Self::Yuv420),
            2 => Some(Self::Yuv422),
            3 => Some(Self::Yuv444),
            _ => None,
        }
    }

    /// 码流编码值
    pub fn code(&self) -> u32 {
        match self {
            Self::Monochrome => 0,
            Self::Yuv420 => 1,
            Self::Yuv422 => 2,
            Self::Yuv444 => 3,
            Self::Undefined => 15,
        }
    }

    /// 平面数量
    pub const fn plane_count(&self) -> usize {
        match self {
            Self::Monochrome => 1,
            Self::Yuv420 | Self::Yuv422 | Self::Yuv444 => 3,
            Self::Undefined => 0,
        }
    }

    /// 色度子采样 (log2 水平, log2 垂直)
    pub const fn chroma_shift(&self) -> (u32, u32) {
        match self {
            Self::Yuv420 => (1, 1),
            Self::Yuv422 => (1, 0),
            _ => (0, 0),
        }
    }

    /// 指定平面的宽度 (样本数), 色度尺寸向上取整
    pub fn plane_width(&self, plane: usize, width: u32) -> usize {
        if plane == 0 {
            return width as usize;
        }
        let (shift_x, _) = self.chroma_shift();
        (width as usize).div_ceil(1 << shift_x)
    }

    /// 指定平面的高度 (行数), 色度尺寸向上取整
    pub fn plane_height(&self, plane: usize, height: u32) -> usize {
        if plane == 0 {
            return height as usize;
        }
        let (_, shift_y) = self.chroma_shift();
        (height as usize).div_ceil(1 << shift_y)
    }

    /// 整帧样本总数
    pub fn total_samples(&self, width: u32, height: u32) -> usize {
        (0..self.plane_count())
            .map(|plane| self.plane_width(plane, width) * self.plane_height(plane, height))
            .sum()
    }
}

impl fmt::Display for ChromaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Monochrome => "mono",
            Self::Yuv420 => "420",
            Self::Yuv422 => "422",
            Self::Yuv444 => "444",
            Self::Undefined => "undefined",
        };
        write!(f, "{name}")
    }
}
