//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `BitmapSource` 表示外部来源语义
//! - `RawImageData` 表示已加载但未解码的字节
//! - `SampledBitmap` / `CompressedImage` 表示各入口的最终输出

use std::path::PathBuf;

use image::DynamicImage;

/// 图片输入来源。
#[derive(Debug, Clone)]
pub enum BitmapSource {
    /// 本地文件路径来源。
    FilePath(PathBuf),
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64(String),
    /// 已在内存中的编码字节。
    Bytes(Vec<u8>),
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 采样解码输出。
#[derive(Debug, Clone)]
pub struct SampledBitmap {
    /// 采样后的图像。
    pub image: DynamicImage,
    /// 原图宽度（像素）。
    pub source_width: u32,
    /// 原图高度（像素）。
    pub source_height: u32,
    /// 实际使用的采样率。
    pub sample_size: u32,
}

/// 质量压缩输出。
#[derive(Debug, Clone)]
pub struct CompressedImage {
    /// JPEG 编码字节。
    pub bytes: Vec<u8>,
    /// 最终使用的 JPEG 质量。
    pub quality: u8,
    pub width: u32,
    pub height: u32,
}
