//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `BitmapConfig`，保证运行时行为可观测、可调整、可测试。
//!
//! ## 实现思路
//!
//! - `Default` 提供与原有行为一致的默认参数（720×480 像素预算、1024 宽度、100KB 目标）。
//! - 通过 `serde` 支持从 JSON 文件加载，缺省字段回落到默认值。
//! - `validate` 在加载后统一做取值范围检查。

use std::path::Path;

use fast_image_resize as fr;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use super::BitmapError;

/// 降采样滤镜策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    /// 区域平均，最接近解码期采样的效果。
    Box,
    Bilinear,
    CatmullRom,
    Lanczos3,
}

impl ResizeFilter {
    pub(crate) fn to_fast_filter(self) -> fr::FilterType {
        match self {
            Self::Box => fr::FilterType::Box,
            Self::Bilinear => fr::FilterType::Bilinear,
            Self::CatmullRom => fr::FilterType::CatmullRom,
            Self::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }

    /// `fast_image_resize` 失败时回退到 `image` 自带缩放所用的滤镜。
    pub(crate) fn to_image_filter(self) -> FilterType {
        match self {
            Self::Box => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// 位图处理配置。
///
/// 字段覆盖了加载、解码、缩放与压缩四个阶段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BitmapConfig {
    /// 读取原始字节时允许的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// `compress_image` 使用的像素预算。
    pub default_max_num_pixels: u32,
    /// `compress_picture` 先缩放到的目标宽度。
    pub compress_target_width: u32,
    /// `compress_picture` 的体积目标（KB）。
    pub compress_target_kb: u64,
    /// 质量压缩每轮下调的步长。
    pub compress_quality_step: u8,
    /// 转 Base64 时的默认 JPEG 质量。
    pub base64_quality: u8,
    /// 采样与缩放使用的滤镜。
    pub resize_filter: ResizeFilter,
}

impl Default for BitmapConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 100_000_000,
            max_decoded_bytes: 400 * 1024 * 1024,
            default_max_num_pixels: 720 * 480,
            compress_target_width: 1024,
            compress_target_kb: 100,
            compress_quality_step: 10,
            base64_quality: 60,
            resize_filter: ResizeFilter::Box,
        }
    }
}

impl BitmapConfig {
    /// 从 JSON 文件加载配置，缺省字段使用默认值。
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BitmapError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BitmapError::FileSystem(format!("无法读取配置文件 {}：{}", path.display(), e))
        })?;

        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, BitmapError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| BitmapError::InvalidFormat(format!("配置解析失败：{}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 检查各字段取值范围。
    pub fn validate(&self) -> Result<(), BitmapError> {
        if self.max_file_size == 0 {
            return Err(BitmapError::InvalidArgument("max_file_size 必须大于 0".to_string()));
        }
        if self.max_decoded_pixels == 0 || self.max_decoded_bytes == 0 {
            return Err(BitmapError::InvalidArgument(
                "max_decoded_pixels / max_decoded_bytes 必须大于 0".to_string(),
            ));
        }
        if self.default_max_num_pixels == 0 {
            return Err(BitmapError::InvalidArgument(
                "default_max_num_pixels 必须大于 0".to_string(),
            ));
        }
        if self.compress_target_width == 0 {
            return Err(BitmapError::InvalidArgument(
                "compress_target_width 必须大于 0".to_string(),
            ));
        }
        if self.compress_target_kb == 0 {
            return Err(BitmapError::InvalidArgument(
                "compress_target_kb 必须大于 0".to_string(),
            ));
        }
        if !(1..=100).contains(&self.compress_quality_step) {
            return Err(BitmapError::InvalidArgument(
                "compress_quality_step 必须在 1~100 之间".to_string(),
            ));
        }
        if !(1..=100).contains(&self.base64_quality) {
            return Err(BitmapError::InvalidArgument(
                "base64_quality 必须在 1~100 之间".to_string(),
            ));
        }
        Ok(())
    }
}
