//! # 位图处理模块（bitmap）
//!
//! ## 设计思路
//!
//! 该模块将“来源加载 → 尺寸探测 → 采样率计算 → 解码缩放 → 编码输出”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `sample_size`：纯函数的采样率计算，不依赖任何 I/O
//! - `handler`：编排整条处理流水线
//! - `loader`：负责文件/Base64/字节加载与签名校验
//! - `pipeline`：负责解码、像素限制、采样与缩放
//! - `codec`：负责 JPEG 编码、质量压缩、Base64 输出与保存
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 调用链
//!
//! ```text
//! main.rs / 库调用方
//!    ↓
//! handler.rs（配置快照 + 阶段耗时日志）
//!    ├─ loader.rs（来源加载 + 体积/签名校验）
//!    ├─ pipeline.rs（header 尺寸 → sample_size.rs → 解码 → 采样/缩放）
//!    └─ codec.rs（JPEG / Base64 / 落盘）
//! ```

mod codec;
mod config;
mod error;
mod handler;
mod loader;
mod pipeline;
pub mod sample_size;
mod source;

pub use config::{BitmapConfig, ResizeFilter};
pub use error::BitmapError;
pub use handler::BitmapHandler;
pub use sample_size::{
    Constraint, SampleConstraints, SampleRequest, compute_initial_sample_size,
    compute_sample_size, compute_sample_size_raw, round_sample_size,
};
pub use source::{BitmapSource, CompressedImage, SampledBitmap};
