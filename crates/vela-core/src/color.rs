//! 色彩矩阵 (YCbCr 矩阵系数).
//!
//! 段头携带, 输出时原样透传给调用方.

use std::fmt;

/// YCbCr 色彩矩阵
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorMatrix {
    /// 未指定
    #[default]
    Undefined,
    /// ITU-R BT.601
    Bt601,
    /// ITU-R BT.709
    Bt709,
    /// ITU-R BT.2020 非恒定亮度
    Bt2020,
}

impl ColorMatrix {
    /// 从码流中的 4 位编码创建, 未知编码视为未指定
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::Bt601,
            2 => Self::Bt709,
            3 => Self::Bt2020,
            _ => Self::Undefined,
        }
    }

    /// 码流编码值
    pub fn code(&self) -> u32 {
        match self {
            Self::Undefined => 0,
            Self::Bt601 => 1,
            Self::Bt709 => 2,
            Self::Bt2020 => 3,
        }
    }
}

impl fmt::Display for ColorMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Undefined => "undefined",
            Self::Bt601 => "bt601",
            Self::Bt709 => "bt709",
            Self::Bt2020 => "bt2020",
        };
        write!(f, "{name}")
    }
}
