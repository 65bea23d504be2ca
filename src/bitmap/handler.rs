//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `BitmapHandler` 只负责流程编排与配置管理。各入口的处理链路：
//! 1. 读取配置快照
//! 2. 按来源加载原始字节
//! 3. 解码（必要时采样 / 缩放）
//! 4. 编码输出
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<BitmapConfig>>` 支持运行时替换。
//! - 单次请求内使用“同一配置快照”，避免处理中途配置漂移。
//! - 记录 `load/decode/encode/total` 阶段耗时，便于性能诊断。

use image::DynamicImage;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use super::source::{CompressedImage, RawImageData, SampledBitmap};
use super::{BitmapConfig, BitmapError, BitmapSource, Constraint, SampleConstraints};

/// 位图处理器。
///
/// 封装了配置状态，并编排各子模块实现完整流程。
pub struct BitmapHandler {
    pub(super) config: Arc<RwLock<BitmapConfig>>,
}

impl BitmapHandler {
    /// 根据初始配置创建处理器，配置非法时直接报错。
    ///
    /// # 示例
    /// ```rust
    /// use bitmap_kit::bitmap::{BitmapConfig, BitmapHandler};
    ///
    /// let handler = BitmapHandler::new(BitmapConfig::default())?;
    /// # Ok::<(), bitmap_kit::bitmap::BitmapError>(())
    /// ```
    pub fn new(config: BitmapConfig) -> Result<Self, BitmapError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
        })
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次请求链路使用一致参数。
    pub fn config_snapshot(&self) -> Result<BitmapConfig, BitmapError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| BitmapError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 整体替换配置。
    pub fn set_config(&self, config: BitmapConfig) -> Result<(), BitmapError> {
        config.validate()?;

        let mut current = self
            .config
            .write()
            .map_err(|_| BitmapError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        *current = config;

        log::info!(
            "⚙️ 已更新位图配置（max_num_pixels={}, target_width={}, target_kb={}, filter={:?}）",
            current.default_max_num_pixels,
            current.compress_target_width,
            current.compress_target_kb,
            current.resize_filter
        );
        Ok(())
    }

    fn load(&self, source: BitmapSource, config: &BitmapConfig) -> Result<RawImageData, BitmapError> {
        match source {
            BitmapSource::FilePath(path) => self.load_from_file(&path, config),
            BitmapSource::Base64(data) => self.load_from_base64(&data, config),
            BitmapSource::Bytes(bytes) => self.load_from_bytes(bytes, config),
        }
    }

    /// 按约束采样解码任意来源的图片。
    pub fn decode_sampled(
        &self,
        source: BitmapSource,
        constraints: SampleConstraints,
    ) -> Result<SampledBitmap, BitmapError> {
        let config = self.config_snapshot()?;
        let total_start = Instant::now();

        let raw = self.load(source, &config)?;
        let load_elapsed = total_start.elapsed();

        let decode_start = Instant::now();
        let sampled = self.decode_sampled_raw(raw, constraints, &config)?;

        log::info!(
            "✅ 采样解码完成 - load={}ms decode={}ms total={}ms",
            load_elapsed.as_millis(),
            decode_start.elapsed().as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(sampled)
    }

    /// 按默认像素预算（720×480）采样解码，不限制最短边。
    pub fn compress_image(&self, source: BitmapSource) -> Result<SampledBitmap, BitmapError> {
        let config = self.config_snapshot()?;
        let constraints = SampleConstraints {
            min_side_length: Constraint::Unconstrained,
            max_num_pixels: Constraint::limit(config.default_max_num_pixels)?,
        };

        self.decode_sampled(source, constraints)
    }

    /// 先缩放到目标宽度，再按体积目标做质量压缩。
    pub fn compress_picture(&self, source: BitmapSource) -> Result<CompressedImage, BitmapError> {
        let config = self.config_snapshot()?;
        let total_start = Instant::now();

        let raw = self.load(source, &config)?;
        let load_elapsed = total_start.elapsed();

        let decode_start = Instant::now();
        let decoded = Self::decode_full(&raw, &config)?;
        let scaled = Self::scale_to_width(decoded, config.compress_target_width, &config)?;
        let decode_elapsed = decode_start.elapsed();

        let encode_start = Instant::now();
        let compressed = Self::compress_to_budget(
            &scaled,
            config.compress_target_kb,
            config.compress_quality_step,
        )?;

        log::info!(
            "✅ 质量压缩完成 - 来源: {} 输出: {}x{} quality={} size={}KB load={}ms decode={}ms encode={}ms total={}ms",
            raw.source_hint,
            compressed.width,
            compressed.height,
            compressed.quality,
            compressed.bytes.len() / 1024,
            load_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            encode_start.elapsed().as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(compressed)
    }

    /// 加载并解码后转为 Base64，未指定质量时使用配置中的默认质量。
    pub fn to_base64(&self, source: BitmapSource, quality: Option<u8>) -> Result<String, BitmapError> {
        let config = self.config_snapshot()?;
        let raw = self.load(source, &config)?;
        let decoded = Self::decode_full(&raw, &config)?;

        let quality = quality.unwrap_or(config.base64_quality);
        let encoded = Self::encode_base64(&decoded, quality)?;
        log::info!("📝 Base64 编码完成 - quality={} 长度={}", quality, encoded.len());

        Ok(encoded)
    }

    /// 将 Base64（或 Data URL）解码为图像。
    pub fn from_base64(&self, data: &str) -> Result<DynamicImage, BitmapError> {
        let config = self.config_snapshot()?;
        let raw = self.load_from_base64(data, &config)?;
        Self::decode_full(&raw, &config)
    }
}
