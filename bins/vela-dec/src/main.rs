//! vela-dec - Vela 码流解码命令行工具
//!
//! - `decode`: 解码长度前缀 NAL 单元文件, 输出原始图像与逐帧统计
//! - `generate`: 生成合成测试码流

mod generate;
mod logging;
mod stream;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{error, info};

use vela_codec::{
    DecodedPicture, Decoder, DecoderConfig, Packet, PictureStats, SegmentDecoder,
};
use vela_core::{ChromaFormat, ColorMatrix, VelaError};

use generate::{GenerateOptions, generate_stream};
use stream::{NalUnitReader, write_nal_unit};

/// Vela 码流解码工具
#[derive(Parser, Debug)]
#[command(name = "vela-dec", version, about = "Vela 段级视频码流解码工具")]
struct Cli {
    /// 日志详细程度 (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// 日志目录
    #[arg(long, default_value = "logs", global = true)]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 解码码流
    Decode(DecodeArgs),
    /// 生成合成测试码流
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// 输入码流 (4 字节大端长度前缀的 NAL 单元序列)
    input: PathBuf,

    /// 原始图像输出文件
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 期望的输出帧间隔 (90 kHz 刻度), 0 表示全部时间层
    #[arg(long, default_value_t = 0)]
    ticks: u32,

    /// 固定输出宽度
    #[arg(long, default_value_t = 0)]
    width: u32,

    /// 固定输出高度
    #[arg(long, default_value_t = 0)]
    height: u32,

    /// 固定输出色度格式
    #[arg(long, value_enum)]
    chroma: Option<ChromaArg>,

    /// 固定输出位深 (8-16)
    #[arg(long, default_value_t = 0)]
    bitdepth: u32,

    /// 固定输出色彩矩阵
    #[arg(long, value_enum)]
    color_matrix: Option<ColorArg>,

    /// 不等待图像池填满即输出
    #[arg(long)]
    no_sliding_window: bool,

    /// 输出 JSON 格式统计
    #[arg(long)]
    json: bool,

    /// 不打印逐帧统计
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// 输出码流文件
    output: PathBuf,

    #[arg(long, default_value_t = 64)]
    width: u32,

    #[arg(long, default_value_t = 32)]
    height: u32,

    #[arg(long, value_enum, default_value_t = ChromaArg::Yuv420)]
    chroma: ChromaArg,

    #[arg(long, value_enum, default_value_t = ColorArg::Bt709)]
    color_matrix: ColorArg,

    #[arg(long, default_value_t = 8)]
    bitdepth: u32,

    /// 每帧 90 kHz 刻度数
    #[arg(long, default_value_t = 3000)]
    ticks: u32,

    /// sub-GOP 长度 (2 的幂)
    #[arg(long, default_value_t = 4)]
    sub_gop_length: u32,

    /// 每段的 sub-GOP 数
    #[arg(long, default_value_t = 2)]
    sub_gops: u32,

    /// 段数
    #[arg(long, default_value_t = 2)]
    segments: u32,

    /// 开放 GOP
    #[arg(long)]
    open_gop: bool,

    /// 每个参考列表的最大参考数
    #[arg(long, default_value_t = 2)]
    num_ref_pics: u32,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ChromaArg {
    Mono,
    Yuv420,
    Yuv422,
    Yuv444,
}

impl From<ChromaArg> for ChromaFormat {
    fn from(arg: ChromaArg) -> Self {
        match arg {
            ChromaArg::Mono => ChromaFormat::Monochrome,
            ChromaArg::Yuv420 => ChromaFormat::Yuv420,
            ChromaArg::Yuv422 => ChromaFormat::Yuv422,
            ChromaArg::Yuv444 => ChromaFormat::Yuv444,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ColorArg {
    Bt601,
    Bt709,
    Bt2020,
}

impl From<ColorArg> for ColorMatrix {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Bt601 => ColorMatrix::Bt601,
            ColorArg::Bt709 => ColorMatrix::Bt709,
            ColorArg::Bt2020 => ColorMatrix::Bt2020,
        }
    }
}

// ============================================================
// JSON 输出结构体
// ============================================================

/// 完整解码结果
#[derive(Serialize)]
struct DecodeReport {
    input: String,
    nal_units: u64,
    pictures: Vec<PictureReport>,
    corrupted_pictures: u64,
    final_state: String,
}

/// 单幅图像统计
#[derive(Serialize)]
struct PictureReport {
    poc: u32,
    doc: u32,
    soc: u32,
    tid: u32,
    qp: i32,
    nal_unit_type: String,
    width: u32,
    height: u32,
    bitdepth: u32,
    bitstream_bitdepth: u32,
    chroma_format: String,
    color_matrix: String,
    framerate: f64,
    bitstream_framerate: f64,
    corrupted: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    l0: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    l1: Vec<i64>,
}

impl From<&PictureStats> for PictureReport {
    fn from(stats: &PictureStats) -> Self {
        let refs = |list: &[i64]| list.iter().copied().filter(|&poc| poc >= 0).collect();
        Self {
            poc: stats.poc,
            doc: stats.doc,
            soc: stats.soc,
            tid: stats.tid,
            qp: stats.qp,
            nal_unit_type: format!("{:?}", stats.nal_unit_type),
            width: stats.width,
            height: stats.height,
            bitdepth: stats.bitdepth,
            bitstream_bitdepth: stats.bitstream_bitdepth,
            chroma_format: stats.chroma_format.to_string(),
            color_matrix: stats.color_matrix.to_string(),
            framerate: stats.framerate,
            bitstream_framerate: stats.bitstream_framerate,
            corrupted: stats.corrupted,
            l0: refs(&stats.l0),
            l1: refs(&stats.l1),
        }
    }
}

// ============================================================
// 主逻辑
// ============================================================

fn main() {
    let cli = Cli::parse();
    if let Err(err) = logging::init(&cli.log_dir, cli.verbose) {
        eprintln!("警告: 日志初始化失败: {err:#}");
    }

    let result = match cli.command {
        Command::Decode(args) => run_decode(&args),
        Command::Generate(args) => run_generate(&args),
    };
    if let Err(err) = result {
        error!("{err:#}");
        eprintln!("错误: {err:#}");
        process::exit(1);
    }
}

fn decoder_config(args: &DecodeArgs) -> Result<DecoderConfig> {
    let mut builder = DecoderConfig::builder()
        .decoder_ticks(args.ticks)
        .output_size(args.width, args.height)
        .output_bitdepth(args.bitdepth)
        .enforce_sliding_window(!args.no_sliding_window);
    if let Some(chroma) = args.chroma {
        builder = builder.output_chroma_format(chroma.into());
    }
    if let Some(color) = args.color_matrix {
        builder = builder.output_color_matrix(color.into());
    }
    Ok(builder.build()?)
}

fn run_decode(args: &DecodeArgs) -> Result<()> {
    let config = decoder_config(args).context("解码参数非法")?;
    let input = File::open(&args.input)
        .with_context(|| format!("无法打开输入文件 '{}'", args.input.display()))?;
    let mut reader = NalUnitReader::new(BufReader::new(input));
    let mut output = match &args.output {
        Some(path) => Some(BufWriter::new(File::create(path).with_context(|| {
            format!("无法创建输出文件 '{}'", path.display())
        })?)),
        None => None,
    };

    let mut decoder = SegmentDecoder::new(config);
    info!(
        "开始解码: {} (解码器 {})",
        args.input.display(),
        decoder.name()
    );

    let mut report = DecodeReport {
        input: args.input.display().to_string(),
        nal_units: 0,
        pictures: Vec::new(),
        corrupted_pictures: 0,
        final_state: String::new(),
    };
    let mut emit = |picture: DecodedPicture| -> Result<()> {
        if let Some(out) = output.as_mut() {
            out.write_all(&picture.bytes).context("写入输出图像失败")?;
        }
        if !args.quiet && !args.json {
            println!("{}", describe(&picture.stats));
        }
        report.pictures.push(PictureReport::from(&picture.stats));
        Ok(())
    };

    loop {
        let pos = reader.offset() as i64;
        let Some(unit) = reader.next_unit()? else {
            break;
        };
        report.nal_units += 1;
        decoder.send_packet(&Packet {
            data: unit.into(),
            pos,
        })?;
        drain(&mut decoder, &mut emit)?;
    }
    decoder.send_packet(&Packet::empty())?;
    drain(&mut decoder, &mut emit)?;

    if let Some(out) = output.as_mut() {
        out.flush().context("写入输出图像失败")?;
    }
    report.corrupted_pictures = decoder.num_corrupted_pics();
    report.final_state = decoder.state().to_string();
    info!(
        "解码完成: {} 个 NAL 单元, {} 幅图像, {} 幅校验失败",
        report.nal_units,
        report.pictures.len(),
        report.corrupted_pictures
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !args.quiet {
        println!(
            "共 {} 幅图像, 校验失败 {} 幅, 最终状态: {}",
            report.pictures.len(),
            report.corrupted_pictures,
            report.final_state
        );
    }
    Ok(())
}

/// 取出当前可输出的全部图像
fn drain(
    decoder: &mut SegmentDecoder,
    emit: &mut impl FnMut(DecodedPicture) -> Result<()>,
) -> Result<()> {
    loop {
        match decoder.receive_frame() {
            Ok(picture) => emit(picture)?,
            Err(VelaError::NeedMoreData | VelaError::Eof) => return Ok(()),
            Err(err) => return Err(err.into()),
        }
    }
}

fn describe(stats: &PictureStats) -> String {
    format!(
        "poc={:<5} doc={:<5} soc={:<3} tid={} qp={:<3} {:?} {}x{} {}bit {}{}",
        stats.poc,
        stats.doc,
        stats.soc,
        stats.tid,
        stats.qp,
        stats.nal_unit_type,
        stats.width,
        stats.height,
        stats.bitdepth,
        stats.chroma_format,
        if stats.corrupted { " [校验失败]" } else { "" }
    )
}

fn run_generate(args: &GenerateArgs) -> Result<()> {
    let opts = GenerateOptions {
        width: args.width,
        height: args.height,
        chroma_format: args.chroma.into(),
        color_matrix: args.color_matrix.into(),
        bitdepth: args.bitdepth,
        ticks: args.ticks,
        sub_gop_length: args.sub_gop_length,
        sub_gops_per_segment: args.sub_gops,
        segments: args.segments,
        open_gop: args.open_gop,
        num_ref_pics: args.num_ref_pics,
    };
    let units = generate_stream(&opts)?;
    let file = File::create(&args.output)
        .with_context(|| format!("无法创建输出文件 '{}'", args.output.display()))?;
    let mut writer = BufWriter::new(file);
    for unit in &units {
        write_nal_unit(&mut writer, unit)?;
    }
    writer.flush()?;
    info!(
        "已生成 {} 个 NAL 单元: {}",
        units.len(),
        args.output.display()
    );
    Ok(())
}
