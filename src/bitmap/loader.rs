//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（本地文件 / Base64 / 内存字节）的原始字节加载，
//! 并在“尽可能早”的阶段执行输入校验，尽快失败，减少不必要的内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! - 文件：存在性 + metadata 体积限制 + 读取。
//! - Base64：格式解析 + 解码前体积估算 + 解码后体积限制。
//! - 所有来源最后都经过文件签名（magic bytes）校验。

use base64::{Engine as _, engine::general_purpose};
use std::path::Path;

use super::source::RawImageData;
use super::{BitmapConfig, BitmapError, BitmapHandler};

const DATA_URL_PREFIX: &str = "data:image/";
const DATA_URL_BASE64_MARKER: &str = ";base64,";

impl BitmapHandler {
    /// 从本地路径加载图片原始字节。
    pub(super) fn load_from_file(
        &self,
        path: &Path,
        config: &BitmapConfig,
    ) -> Result<RawImageData, BitmapError> {
        log::info!("📁 开始读取本地图片 - 路径: {}", path.display());

        if !path.exists() {
            return Err(BitmapError::FileSystem(format!("文件不存在：{}", path.display())));
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| BitmapError::FileSystem(format!("无法读取文件信息：{}", e)))?;

        if !metadata.is_file() {
            return Err(BitmapError::FileSystem(format!("不是普通文件：{}", path.display())));
        }

        if metadata.len() > config.max_file_size {
            return Err(BitmapError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = std::fs::read(path)
            .map_err(|e| BitmapError::FileSystem(format!("无法读取图片文件：{}", e)))?;
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "file",
        })
    }

    /// 从 Base64 字符串加载图片原始字节。
    pub(super) fn load_from_base64(
        &self,
        data: &str,
        config: &BitmapConfig,
    ) -> Result<RawImageData, BitmapError> {
        log::info!("📝 开始处理 base64 图片");

        let bytes = Self::parse_base64_with_limit(data, config.max_file_size)?;

        if bytes.len() as u64 > config.max_file_size {
            return Err(BitmapError::ResourceLimit(format!(
                "Base64 解码后体积过大：{:.2} MB（限制：{:.2} MB）",
                bytes.len() as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "base64",
        })
    }

    /// 接收调用方已持有的编码字节。
    pub(super) fn load_from_bytes(
        &self,
        bytes: Vec<u8>,
        config: &BitmapConfig,
    ) -> Result<RawImageData, BitmapError> {
        if bytes.len() as u64 > config.max_file_size {
            return Err(BitmapError::ResourceLimit(format!(
                "图片字节过大：{:.2} MB（限制：{:.2} MB）",
                bytes.len() as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "bytes",
        })
    }

    fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, BitmapError> {
        let len = base64_data.len() as u64;
        let groups = len
            .checked_add(3)
            .ok_or_else(|| BitmapError::ResourceLimit("Base64 输入长度溢出".to_string()))?
            / 4;

        groups
            .checked_mul(3)
            .ok_or_else(|| BitmapError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
    }

    /// 解析 Base64 输入（支持 Data URL / 纯 Base64），负载中的空白与换行会被忽略。
    pub(super) fn parse_base64_with_limit(
        data: &str,
        max_file_size: u64,
    ) -> Result<Vec<u8>, BitmapError> {
        let normalized = data.trim();

        let payload = if normalized.starts_with(DATA_URL_PREFIX) {
            let base64_start = normalized
                .find(DATA_URL_BASE64_MARKER)
                .ok_or_else(|| BitmapError::InvalidFormat("缺少 base64 标记".to_string()))?;
            &normalized[base64_start + DATA_URL_BASE64_MARKER.len()..]
        } else {
            normalized
        };

        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if compact.is_empty() {
            return Err(BitmapError::InvalidFormat("Base64 内容为空".to_string()));
        }

        let estimated_len = Self::estimate_base64_decoded_upper_bound_len(&compact)?;
        if estimated_len > max_file_size {
            return Err(BitmapError::ResourceLimit(format!(
                "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
                estimated_len as f64 / 1024.0 / 1024.0,
                max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| BitmapError::Decode(format!("Base64 解码失败：{}", e)))
    }

    /// 通过文件签名（magic bytes）校验输入是否为图片。
    fn validate_image_signature(bytes: &[u8]) -> Result<(), BitmapError> {
        if bytes.is_empty() {
            return Err(BitmapError::InvalidFormat("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| BitmapError::InvalidFormat("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(BitmapError::InvalidFormat(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_base64_rejects_non_image_payload() {
        let handler = BitmapHandler::new(BitmapConfig::default()).expect("handler init failed");
        let config = BitmapConfig::default();

        let result = handler.load_from_base64("SGVsbG8=", &config);

        assert!(matches!(result, Err(BitmapError::InvalidFormat(_))));
    }

    #[test]
    fn parse_base64_with_limit_rejects_large_payload_before_decode() {
        let huge = "A".repeat(1024 * 1024);
        let result = BitmapHandler::parse_base64_with_limit(&huge, 32);

        assert!(matches!(result, Err(BitmapError::ResourceLimit(_))));
    }

    #[test]
    fn parse_base64_ignores_line_breaks() {
        let wrapped = "SGVs\nbG8g\r\nd29y bGQ=";
        let bytes = BitmapHandler::parse_base64_with_limit(wrapped, 1024).expect("should decode");

        assert_eq!(bytes, b"Hello world");
    }

    #[test]
    fn parse_base64_accepts_data_url() {
        let bytes = BitmapHandler::parse_base64_with_limit("data:image/png;base64,SGVsbG8=", 1024)
            .expect("should decode");

        assert_eq!(bytes, b"Hello");
    }

    #[test]
    fn parse_base64_rejects_data_url_without_marker() {
        let result = BitmapHandler::parse_base64_with_limit("data:image/png,SGVsbG8=", 1024);

        assert!(matches!(result, Err(BitmapError::InvalidFormat(_))));
    }

    #[test]
    fn load_from_file_reports_missing_file() {
        let handler = BitmapHandler::new(BitmapConfig::default()).expect("handler init failed");
        let config = BitmapConfig::default();
        let dir = tempfile::tempdir().expect("tempdir");

        let result = handler.load_from_file(&dir.path().join("missing.png"), &config);

        assert!(matches!(result, Err(BitmapError::FileSystem(_))));
    }

    #[test]
    fn load_from_bytes_respects_size_limit() {
        let handler = BitmapHandler::new(BitmapConfig::default()).expect("handler init failed");
        let config = BitmapConfig {
            max_file_size: 4,
            ..BitmapConfig::default()
        };
        let png_signature = vec![137_u8, 80, 78, 71, 13, 10, 26, 10];

        let result = handler.load_from_bytes(png_signature, &config);

        assert!(matches!(result, Err(BitmapError::ResourceLimit(_))));
    }
}
