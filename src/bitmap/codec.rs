//! # 编码与输出模块
//!
//! ## 设计思路
//!
//! 集中处理“图像 → 字节”方向的所有操作：JPEG 编码、按体积目标的质量压缩、
//! Base64 输出以及落盘保存。JPEG 不支持透明通道，编码前统一转为 RGB8。
//!
//! ## 实现思路
//!
//! - 质量压缩从 100 开始，每轮按步长下调，直到体积（KB）低于目标或质量降到 0。
//! - Base64 使用标准字母表且不带换行，便于直接嵌入 JSON / Data URL。
//! - 保存时仅允许写入普通文件路径，目录路径直接报错。

use base64::{Engine as _, engine::general_purpose};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, GenericImageView};
use std::path::Path;

use super::source::CompressedImage;
use super::{BitmapError, BitmapHandler};

const MAX_JPEG_QUALITY: u8 = 100;

impl BitmapHandler {
    /// 以指定质量编码为 JPEG，质量会被限制在 1~100。
    pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, BitmapError> {
        let quality = quality.clamp(1, MAX_JPEG_QUALITY);
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality)
            .encode(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
            .map_err(|e| BitmapError::Encode(format!("JPEG 编码失败：{}", e)))?;

        Ok(bytes)
    }

    /// 逐步降低质量，直到编码体积低于 `target_kb`。
    ///
    /// 质量降到 0 仍未达标时返回最后一次的结果。
    pub(crate) fn compress_to_budget(
        image: &DynamicImage,
        target_kb: u64,
        step: u8,
    ) -> Result<CompressedImage, BitmapError> {
        if step == 0 {
            return Err(BitmapError::InvalidArgument("质量步长必须大于 0".to_string()));
        }

        let mut quality = MAX_JPEG_QUALITY;
        let mut bytes = Self::encode_jpeg(image, quality)?;

        while bytes.len() as u64 / 1024 >= target_kb && quality > 0 {
            quality = quality.saturating_sub(step);
            bytes = Self::encode_jpeg(image, quality)?;
            log::debug!("🗜️ 质量压缩：quality={} size={}KB", quality, bytes.len() / 1024);
        }

        let (width, height) = image.dimensions();
        Ok(CompressedImage {
            bytes,
            quality: quality.max(1),
            width,
            height,
        })
    }

    /// JPEG 编码后转为不含换行的标准 Base64。
    pub fn encode_base64(image: &DynamicImage, quality: u8) -> Result<String, BitmapError> {
        let bytes = Self::encode_jpeg(image, quality)?;
        Ok(general_purpose::STANDARD.encode(bytes))
    }

    /// 以最高质量保存为 JPEG 文件，已存在的文件会被覆盖。
    pub fn save_jpeg(image: &DynamicImage, path: impl AsRef<Path>) -> Result<(), BitmapError> {
        let path = path.as_ref();
        if path.is_dir() {
            return Err(BitmapError::FileSystem(format!("目标路径是目录：{}", path.display())));
        }

        let bytes = Self::encode_jpeg(image, MAX_JPEG_QUALITY)?;
        std::fs::write(path, &bytes)
            .map_err(|e| BitmapError::FileSystem(format!("写入图片文件失败：{}", e)))?;

        log::info!(
            "💾 图片已保存 - 路径: {} 大小: {}KB",
            path.display(),
            bytes.len() / 1024
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn noisy_image(width: u32, height: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let v = x.wrapping_mul(2_654_435_761).wrapping_add(y.wrapping_mul(40_503));
            Rgba([(v >> 3) as u8, (v >> 11) as u8, (v >> 19) as u8, 255])
        });
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn encode_jpeg_drops_alpha_and_produces_jpeg() {
        let bytes = BitmapHandler::encode_jpeg(&noisy_image(16, 16), 80).expect("encode");

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn compress_to_budget_stops_under_target() {
        let image = noisy_image(512, 512);
        let compressed = BitmapHandler::compress_to_budget(&image, 40, 10).expect("compress");

        assert!(compressed.quality < 100);
        assert!(compressed.bytes.len() / 1024 < 40 || compressed.quality == 1);
        assert_eq!((compressed.width, compressed.height), (512, 512));
    }

    #[test]
    fn compress_to_budget_keeps_full_quality_for_small_images() {
        let image = DynamicImage::new_rgb8(8, 8);
        let compressed = BitmapHandler::compress_to_budget(&image, 100, 10).expect("compress");

        assert_eq!(compressed.quality, 100);
    }

    #[test]
    fn compress_to_budget_rejects_zero_step() {
        let result = BitmapHandler::compress_to_budget(&DynamicImage::new_rgb8(4, 4), 1, 0);

        assert!(matches!(result, Err(BitmapError::InvalidArgument(_))));
    }

    #[test]
    fn encode_base64_has_no_line_breaks() {
        let encoded = BitmapHandler::encode_base64(&noisy_image(128, 128), 60).expect("encode");

        assert!(!encoded.contains('\n'));
        assert!(!encoded.contains('\r'));
    }

    #[test]
    fn save_jpeg_refuses_directory_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = BitmapHandler::save_jpeg(&DynamicImage::new_rgb8(4, 4), dir.path());

        assert!(matches!(result, Err(BitmapError::FileSystem(_))));
    }
}
