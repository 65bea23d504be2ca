//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载位图链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 其中 `InvalidArgument` 专门表示调用方违反入参约定（如宽高为 0），
//! 属于编程错误，不做任何恢复。

/// 位图处理统一错误类型。
///
/// 该类型会在命令行层被上转为 `AppError`。
#[derive(Debug, thiserror::Error)]
pub enum BitmapError {
    #[error("参数错误：{0}")]
    InvalidArgument(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}
