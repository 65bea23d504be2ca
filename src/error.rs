//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义命令行层统一的 `AppError` 枚举，所有子命令统一返回 `Result<T, AppError>`，
//! 库内部的 `BitmapError` 通过 `From` 自动上转，无需手动 map。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 实现 `Serialize` 将错误序列化为字符串，便于 `--json` 输出结构化结果。

use serde::Serialize;

use crate::bitmap::BitmapError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 位图处理流水线错误（加载 / 解码 / 编码）
    #[error("{0}")]
    Bitmap(#[from] BitmapError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 配置或命令行参数不可用
    #[error("配置错误: {0}")]
    Config(String),
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
