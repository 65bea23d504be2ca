//! # 解码与变换流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 尺寸探测 → 采样率 → 解码 → 缩放”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 读取 header 尺寸
//! 2. 按像素 / 内存上限快速拒绝
//! 3. 由 header 尺寸与约束计算采样率
//! 4. 完整解码
//! 5. 按采样率缩小（`fast_image_resize`，失败时回退 `image::imageops`）

use fast_image_resize as fr;
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgba};
use std::io::Cursor;

use super::sample_size::{SampleRequest, compute_sample_size};
use super::source::{RawImageData, SampledBitmap};
use super::{BitmapConfig, BitmapError, BitmapHandler, ResizeFilter, SampleConstraints};

impl BitmapHandler {
    /// 将原始字节按约束采样解码。
    pub(crate) fn decode_sampled_raw(
        &self,
        raw: RawImageData,
        constraints: SampleConstraints,
        config: &BitmapConfig,
    ) -> Result<SampledBitmap, BitmapError> {
        let (header_width, header_height) = Self::inspect_dimensions(&raw.bytes)?;

        let request = SampleRequest::new(header_width, header_height)?
            .with_min_side_length(constraints.min_side_length)
            .with_max_num_pixels(constraints.max_num_pixels);
        let sample_size = compute_sample_size(&request);

        let decoded = Self::decode_full(&raw, config)?;
        let (width, height) = decoded.dimensions();

        let image = Self::subsample(decoded, sample_size, config.resize_filter)?;

        log::info!(
            "✅ 图片采样解码成功 - 来源: {} 原始尺寸: {}x{} 采样率: {} 输出尺寸: {}x{}",
            raw.source_hint,
            width,
            height,
            sample_size,
            image.width(),
            image.height()
        );

        Ok(SampledBitmap {
            image,
            source_width: width,
            source_height: height,
            sample_size,
        })
    }

    /// 完整解码（含解码前后两次资源校验）。
    pub(crate) fn decode_full(
        raw: &RawImageData,
        config: &BitmapConfig,
    ) -> Result<DynamicImage, BitmapError> {
        let (header_width, header_height) = Self::inspect_dimensions(&raw.bytes)?;
        Self::validate_pixel_limits(config, header_width, header_height)?;
        Self::validate_decoded_memory_limits(config, header_width, header_height)?;

        let decoded = image::load_from_memory(&raw.bytes)
            .map_err(|e| BitmapError::Decode(format!("图片解码失败：{}", e)))?;

        let (width, height) = decoded.dimensions();
        Self::validate_pixel_limits(config, width, height)?;
        Self::validate_decoded_memory_limits(config, width, height)?;

        Ok(decoded)
    }

    /// 仅通过内存中的图片头信息读取宽高。
    ///
    /// 用于在完整解码前做像素限制检查与采样率计算。
    pub(crate) fn inspect_dimensions(bytes: &[u8]) -> Result<(u32, u32), BitmapError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| BitmapError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| BitmapError::InvalidFormat(format!("无法读取图片尺寸：{}", e)))
    }

    /// 校验像素数量是否超过配置上限。
    fn validate_pixel_limits(
        config: &BitmapConfig,
        width: u32,
        height: u32,
    ) -> Result<(), BitmapError> {
        let pixels = u64::from(width)
            .checked_mul(u64::from(height))
            .ok_or_else(|| BitmapError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > config.max_decoded_pixels {
            return Err(BitmapError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        Ok(())
    }

    fn validate_decoded_memory_limits(
        config: &BitmapConfig,
        width: u32,
        height: u32,
    ) -> Result<(), BitmapError> {
        let estimated = u64::from(width)
            .checked_mul(u64::from(height))
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| BitmapError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

        if estimated > config.max_decoded_bytes {
            return Err(BitmapError::ResourceLimit(format!(
                "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
                estimated as f64 / 1024.0 / 1024.0,
                config.max_decoded_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(())
    }

    /// 按采样率缩小，输出尺寸为 `ceil(w / n) x ceil(h / n)`。
    pub(crate) fn subsample(
        image: DynamicImage,
        sample_size: u32,
        filter: ResizeFilter,
    ) -> Result<DynamicImage, BitmapError> {
        if sample_size <= 1 {
            return Ok(image);
        }

        let (width, height) = image.dimensions();
        let target_width = width.div_ceil(sample_size).max(1);
        let target_height = height.div_ceil(sample_size).max(1);

        Self::resize_with_fallback(image, target_width, target_height, filter)
    }

    /// 等比缩放到指定宽度，放大与缩小均可。
    ///
    /// 放大后的尺寸同样受像素 / 内存上限约束。
    pub(crate) fn scale_to_width(
        image: DynamicImage,
        target_width: u32,
        config: &BitmapConfig,
    ) -> Result<DynamicImage, BitmapError> {
        if target_width == 0 {
            return Err(BitmapError::InvalidArgument("目标宽度必须大于 0".to_string()));
        }

        let (width, height) = image.dimensions();
        if width == target_width {
            return Ok(image);
        }

        let scale = f64::from(target_width) / f64::from(width);
        let scaled_height = (f64::from(height) * scale).round();
        let target_height = if scaled_height.is_finite() && scaled_height <= f64::from(u32::MAX) {
            (scaled_height as u32).max(1)
        } else {
            return Err(BitmapError::ResourceLimit(format!(
                "缩放后高度溢出：{}x{} -> 宽度 {}",
                width, height, target_width
            )));
        };

        Self::validate_pixel_limits(config, target_width, target_height)?;
        Self::validate_decoded_memory_limits(config, target_width, target_height)?;

        log::debug!(
            "📐 按宽度缩放：{}x{} -> {}x{}",
            width,
            height,
            target_width,
            target_height
        );

        Self::resize_with_fallback(image, target_width, target_height, config.resize_filter)
    }

    fn resize_with_fallback(
        image: DynamicImage,
        target_width: u32,
        target_height: u32,
        filter: ResizeFilter,
    ) -> Result<DynamicImage, BitmapError> {
        match Self::resize_with_fast_image_resize(&image, target_width, target_height, filter) {
            Ok(resized) => Ok(resized),
            Err(err) => {
                log::warn!(
                    "⚠️ fast_image_resize 缩放失败，回退 image::resize_exact：{}",
                    err
                );
                Ok(image.resize_exact(target_width, target_height, filter.to_image_filter()))
            }
        }
    }

    fn resize_with_fast_image_resize(
        image: &DynamicImage,
        target_width: u32,
        target_height: u32,
        filter: ResizeFilter,
    ) -> Result<DynamicImage, BitmapError> {
        let src = image.to_rgba8();
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.into_raw(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| BitmapError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(filter.to_fast_filter()));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| BitmapError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

        let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
            target_width,
            target_height,
            dst_image.into_vec(),
        )
        .ok_or_else(|| BitmapError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))?;

        Ok(DynamicImage::ImageRgba8(rgba))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Constraint;
    use image::ImageFormat;

    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x % 255) as u8;
            let g = (y % 255) as u8;
            let b = ((x + y) % 255) as u8;
            Rgba([r, g, b, 255])
        });

        let dyn_img = DynamicImage::ImageRgba8(img);
        let mut cursor = Cursor::new(Vec::new());
        dyn_img
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    fn raw(bytes: Vec<u8>) -> RawImageData {
        RawImageData {
            bytes,
            source_hint: "test",
        }
    }

    #[test]
    fn inspect_dimensions_reads_header() {
        let png = create_png_bytes(37, 11);
        assert_eq!(BitmapHandler::inspect_dimensions(&png).ok(), Some((37, 11)));
    }

    #[test]
    fn decode_sampled_applies_pixel_budget() {
        let handler = BitmapHandler::new(BitmapConfig::default()).expect("handler init failed");
        let config = BitmapConfig::default();
        let constraints = SampleConstraints {
            min_side_length: Constraint::Unconstrained,
            max_num_pixels: Constraint::limit(400 * 300).expect("positive"),
        };

        // ceil(sqrt(1600 * 1200 / 120000)) = 4 -> 4
        let sampled = handler
            .decode_sampled_raw(raw(create_png_bytes(1600, 1200)), constraints, &config)
            .expect("sampled decode should succeed");

        assert_eq!(sampled.sample_size, 4);
        assert_eq!((sampled.source_width, sampled.source_height), (1600, 1200));
        assert_eq!(sampled.image.dimensions(), (400, 300));
    }

    #[test]
    fn decode_sampled_without_constraints_keeps_size() {
        let handler = BitmapHandler::new(BitmapConfig::default()).expect("handler init failed");
        let config = BitmapConfig::default();

        let sampled = handler
            .decode_sampled_raw(raw(create_png_bytes(64, 48)), SampleConstraints::default(), &config)
            .expect("sampled decode should succeed");

        assert_eq!(sampled.sample_size, 1);
        assert_eq!(sampled.image.dimensions(), (64, 48));
    }

    #[test]
    fn subsample_rounds_odd_sizes_up() {
        let image = DynamicImage::new_rgba8(10, 7);
        let out = BitmapHandler::subsample(image, 4, ResizeFilter::Box).expect("subsample");

        assert_eq!(out.dimensions(), (3, 2));
    }

    #[test]
    fn scale_to_width_keeps_aspect_ratio() {
        let image = DynamicImage::new_rgba8(2048, 1536);
        let out = BitmapHandler::scale_to_width(image, 1024, &BitmapConfig::default()).expect("scale");

        assert_eq!(out.dimensions(), (1024, 768));
    }

    #[test]
    fn scale_to_width_also_enlarges() {
        let image = DynamicImage::new_rgba8(100, 50);
        let out = BitmapHandler::scale_to_width(image, 300, &BitmapConfig::default()).expect("scale");

        assert_eq!(out.dimensions(), (300, 150));
    }

    #[test]
    fn scale_to_width_rejects_enlargement_over_pixel_limit() {
        let config = BitmapConfig {
            max_decoded_pixels: 10_000,
            ..BitmapConfig::default()
        };

        // 10x100 -> 1024x10240
        let result = BitmapHandler::scale_to_width(DynamicImage::new_rgba8(10, 100), 1024, &config);

        assert!(matches!(result, Err(BitmapError::ResourceLimit(_))));
    }

    #[test]
    fn scale_to_width_rejects_huge_enlargement_of_narrow_strip() {
        let config = BitmapConfig {
            max_decoded_bytes: 1024 * 1024,
            ..BitmapConfig::default()
        };

        // 1x20000 -> 1024x20480000
        let result = BitmapHandler::scale_to_width(DynamicImage::new_rgba8(1, 20_000), 1024, &config);

        assert!(matches!(result, Err(BitmapError::ResourceLimit(_))));
    }

    #[test]
    fn stress_rejects_too_many_pixels() {
        let config = BitmapConfig {
            max_decoded_pixels: 100,
            ..BitmapConfig::default()
        };

        let result = BitmapHandler::decode_full(&raw(create_png_bytes(20, 20)), &config);

        assert!(matches!(result, Err(BitmapError::ResourceLimit(_))));
    }
}
