//! # 位图工具集 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              命令行 (main.rs, clap 子命令)                │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  └─ bitmap ───── BitmapHandler                           │
//! │      ├─ sample_size  采样率计算（纯函数）                  │
//! │      ├─ loader       文件 / Base64 / 字节加载              │
//! │      ├─ pipeline     解码·采样·缩放                        │
//! │      └─ codec        JPEG·质量压缩·Base64·保存             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，命令行各子命令的返回类型 |
//! | [`bitmap`] | 采样率计算、采样解码、质量压缩、Base64 互转、保存 |

pub mod bitmap;
pub mod error;
