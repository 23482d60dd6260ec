//! 解码会话配置.

use vela_core::{ChromaFormat, ColorMatrix, VelaError, VelaResult};

/// 解码器刻度上限 (与段头中 24 位帧率刻度一致)
pub const MAX_DECODER_TICKS: u32 = (1 << 24) - 1;

/// 解码会话配置
///
/// 只能通过 [`DecoderConfig::builder`] 创建, 构建时完成跨字段校验.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// 期望的输出帧间隔 (90 kHz 刻度), 0 表示解码全部时间层
    pub(crate) decoder_ticks: u32,
    /// 固定的输出尺寸, `None` 表示沿用第一个段头
    pub(crate) output_size: Option<(u32, u32)>,
    pub(crate) output_chroma_format: Option<ChromaFormat>,
    pub(crate) output_bitdepth: Option<u32>,
    pub(crate) output_color_matrix: Option<ColorMatrix>,
    /// 是否在输出前等待图像池填满
    pub(crate) enforce_sliding_window: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            decoder_ticks: 0,
            output_size: None,
            output_chroma_format: None,
            output_bitdepth: None,
            output_color_matrix: None,
            enforce_sliding_window: true,
        }
    }
}

impl DecoderConfig {
    /// 创建配置构建器
    pub fn builder() -> DecoderConfigBuilder {
        DecoderConfigBuilder::new()
    }

    pub fn decoder_ticks(&self) -> u32 {
        self.decoder_ticks
    }

    pub fn output_size(&self) -> Option<(u32, u32)> {
        self.output_size
    }

    pub fn output_chroma_format(&self) -> Option<ChromaFormat> {
        self.output_chroma_format
    }

    pub fn output_bitdepth(&self) -> Option<u32> {
        self.output_bitdepth
    }

    pub fn output_color_matrix(&self) -> Option<ColorMatrix> {
        self.output_color_matrix
    }

    pub fn enforce_sliding_window(&self) -> bool {
        self.enforce_sliding_window
    }
}

/// [`DecoderConfig`] 构建器
#[must_use]
#[derive(Debug, Clone)]
pub struct DecoderConfigBuilder {
    decoder_ticks: u32,
    output_width: u32,
    output_height: u32,
    output_chroma_format: ChromaFormat,
    output_bitdepth: u32,
    output_color_matrix: ColorMatrix,
    enforce_sliding_window: bool,
}

impl Default for DecoderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderConfigBuilder {
    /// 默认配置: 全帧率, 输出格式沿用码流, 等待图像池填满
    pub fn new() -> Self {
        Self {
            decoder_ticks: 0,
            output_width: 0,
            output_height: 0,
            output_chroma_format: ChromaFormat::Undefined,
            output_bitdepth: 0,
            output_color_matrix: ColorMatrix::Undefined,
            enforce_sliding_window: true,
        }
    }

    /// 期望的输出帧间隔 (90 kHz 刻度)
    ///
    /// 大于码流帧间隔时按 2 的幂丢弃高时间层.
    pub fn decoder_ticks(mut self, ticks: u32) -> Self {
        self.decoder_ticks = ticks;
        self
    }

    /// 固定输出尺寸, 宽高都为 0 表示沿用码流
    pub fn output_size(mut self, width: u32, height: u32) -> Self {
        self.output_width = width;
        self.output_height = height;
        self
    }

    /// 固定输出色度格式, `Undefined` 表示沿用码流
    pub fn output_chroma_format(mut self, chroma_format: ChromaFormat) -> Self {
        self.output_chroma_format = chroma_format;
        self
    }

    /// 固定输出位深 (8-16), 0 表示沿用码流
    pub fn output_bitdepth(mut self, bitdepth: u32) -> Self {
        self.output_bitdepth = bitdepth;
        self
    }

    /// 固定输出色彩矩阵, `Undefined` 表示沿用码流
    pub fn output_color_matrix(mut self, color_matrix: ColorMatrix) -> Self {
        self.output_color_matrix = color_matrix;
        self
    }

    /// 输出前是否等待图像池填满
    ///
    /// 关闭后图像解码完成即可输出, 输出顺序只在已解码图像之间保证.
    pub fn enforce_sliding_window(mut self, enforce: bool) -> Self {
        self.enforce_sliding_window = enforce;
        self
    }

    /// 校验并生成配置
    pub fn build(self) -> VelaResult<DecoderConfig> {
        if self.decoder_ticks > MAX_DECODER_TICKS {
            return Err(VelaError::InvalidArgument(format!(
                "解码器刻度 {} 超过上限 {}",
                self.decoder_ticks, MAX_DECODER_TICKS
            )));
        }
        if self.output_bitdepth != 0 && !(8..=16).contains(&self.output_bitdepth) {
            return Err(VelaError::InvalidArgument(format!(
                "输出位深 {} 不在 8-16 范围内",
                self.output_bitdepth
            )));
        }
        let output_size = match (self.output_width, self.output_height) {
            (0, 0) => None,
            (0, _) | (_, 0) => {
                return Err(VelaError::InvalidArgument(format!(
                    "输出尺寸 {}x{} 必须同时指定宽和高",
                    self.output_width, self.output_height
                )));
            }
            (w, h) => Some((w, h)),
        };

        Ok(DecoderConfig {
            decoder_ticks: self.decoder_ticks,
            output_size,
            output_chroma_format: (self.output_chroma_format != ChromaFormat::Undefined)
                .then_some(self.output_chroma_format),
            output_bitdepth: (self.output_bitdepth != 0).then_some(self.output_bitdepth),
            output_color_matrix: (self.output_color_matrix != ColorMatrix::Undefined)
                .then_some(self.output_color_matrix),
            enforce_sliding_window: self.enforce_sliding_window,
        })
    }
}
