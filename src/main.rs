//! # 位图工具集 — 命令行入口
//!
//! 本文件仅负责日志初始化、参数解析与子命令分发。
//! 业务逻辑位于 `bitmap` 模块，详见 `lib.rs` 架构文档。

use std::path::PathBuf;
use std::process::ExitCode;

use bitmap_kit::bitmap::{
    BitmapConfig, BitmapError, BitmapHandler, BitmapSource, Constraint, SampleConstraints,
    SampleRequest, compute_sample_size,
};
use bitmap_kit::error::AppError;
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "bitmap-kit", version, about = "采样解码、质量压缩与 Base64 互转")]
struct Cli {
    /// JSON 配置文件路径，缺省字段使用默认值
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 出错时以 JSON 形式输出错误
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 计算采样率（-1 表示不限制）
    SampleSize {
        #[arg(allow_negative_numbers = true)]
        width: i64,
        #[arg(allow_negative_numbers = true)]
        height: i64,
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        min_side: i64,
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        max_pixels: i64,
    },
    /// 按约束采样解码并保存为 JPEG
    Decode {
        src: PathBuf,
        dst: PathBuf,
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        min_side: i64,
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        max_pixels: i64,
    },
    /// 缩放到目标宽度并按体积目标压缩为 JPEG
    Compress { src: PathBuf, dst: PathBuf },
    /// 将图片转为 Base64 输出到标准输出
    ToBase64 {
        src: PathBuf,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,
    },
    /// 从包含 Base64 文本的文件还原图片并保存为 JPEG
    FromBase64 { input: PathBuf, dst: PathBuf },
}

#[derive(Serialize)]
struct SampleSizeReport {
    width: i64,
    height: i64,
    min_side_length: Constraint,
    max_num_pixels: Constraint,
    sample_size: u32,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let json = cli.json;

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("❌ 执行失败: {err}");
            if json {
                eprintln!("{}", serde_json::json!({ "error": err }));
            } else {
                eprintln!("{err}");
            }
            ExitCode::FAILURE
        }
    }
}

fn to_dimension(value: i64) -> Result<u32, BitmapError> {
    u32::try_from(value)
        .map_err(|_| BitmapError::InvalidArgument(format!("图片宽高超出范围：{}", value)))
}

fn run(cli: Cli) -> Result<(), AppError> {
    let config = match &cli.config {
        Some(path) => BitmapConfig::from_json_file(path).map_err(|e| AppError::Config(e.to_string()))?,
        None => BitmapConfig::default(),
    };
    let handler = BitmapHandler::new(config)?;

    match cli.command {
        Command::SampleSize {
            width,
            height,
            min_side,
            max_pixels,
        } => {
            let constraints = SampleConstraints::from_raw(min_side, max_pixels)?;
            let request = SampleRequest::new(to_dimension(width)?, to_dimension(height)?)?
                .with_min_side_length(constraints.min_side_length)
                .with_max_num_pixels(constraints.max_num_pixels);
            let report = SampleSizeReport {
                width,
                height,
                min_side_length: constraints.min_side_length,
                max_num_pixels: constraints.max_num_pixels,
                sample_size: compute_sample_size(&request),
            };
            let rendered = serde_json::to_string_pretty(&report)
                .map_err(|e| AppError::Config(format!("序列化结果失败: {e}")))?;
            println!("{rendered}");
        }
        Command::Decode {
            src,
            dst,
            min_side,
            max_pixels,
        } => {
            let constraints = SampleConstraints::from_raw(min_side, max_pixels)?;
            let sampled = handler.decode_sampled(BitmapSource::FilePath(src), constraints)?;
            BitmapHandler::save_jpeg(&sampled.image, &dst)?;
            println!(
                "{}x{} -> {}x{} (sample_size={})",
                sampled.source_width,
                sampled.source_height,
                sampled.image.width(),
                sampled.image.height(),
                sampled.sample_size
            );
        }
        Command::Compress { src, dst } => {
            let compressed = handler.compress_picture(BitmapSource::FilePath(src))?;
            std::fs::write(&dst, &compressed.bytes)?;
            println!(
                "{}x{} quality={} size={}KB",
                compressed.width,
                compressed.height,
                compressed.quality,
                compressed.bytes.len() / 1024
            );
        }
        Command::ToBase64 { src, quality } => {
            println!("{}", handler.to_base64(BitmapSource::FilePath(src), quality)?);
        }
        Command::FromBase64 { input, dst } => {
            let text = std::fs::read_to_string(&input)?;
            let image = handler.from_base64(&text)?;
            BitmapHandler::save_jpeg(&image, &dst)?;
            println!("{}x{}", image.width(), image.height());
        }
    }

    Ok(())
}
