//! # 采样率计算模块
//!
//! ## 设计思路
//!
//! 解码大图前先根据“真实宽高 + 约束条件”算出一个整数采样步长，
//! 让解码结果直接落在所需尺寸附近，避免为全分辨率位图分配内存。
//!
//! 两个约束均可缺省：
//! - `min_side_length`：希望保留的最短边长度（决定采样率上界）
//! - `max_num_pixels`：允许的最大像素总数（决定采样率下界）
//!
//! ## 实现思路
//!
//! 1. 由两个约束分别求出下界 / 上界，得到初始采样率
//! 2. 初始值 ≤ 8 时向上取到 2 的幂，> 8 时向上取到 8 的倍数
//!
//! 纯函数，无共享状态，可在任意线程并发调用。

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::BitmapError;

/// 原始整数形式下表示“不限制”的哨兵值。
pub const UNCONSTRAINED_SENTINEL: i64 = -1;

/// 未给出最短边约束时的默认上界。
const DEFAULT_UPPER_BOUND: u32 = 128;

/// 采样率不超过该值时按 2 的幂取整，否则按 8 的倍数取整。
const POWER_OF_TWO_LIMIT: u32 = 8;

/// 单个约束条件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// 不限制。
    #[default]
    Unconstrained,
    /// 正整数上限。
    Limit(NonZeroU32),
}

impl Constraint {
    /// 构造一个正整数约束，`0` 视为非法参数。
    pub fn limit(value: u32) -> Result<Self, BitmapError> {
        NonZeroU32::new(value)
            .map(Self::Limit)
            .ok_or_else(|| BitmapError::InvalidArgument("约束值必须为正整数".to_string()))
    }

    /// 从原始整数解析约束：`-1` 表示不限制，正数表示上限，其余值均非法。
    pub fn from_raw(value: i64) -> Result<Self, BitmapError> {
        if value == UNCONSTRAINED_SENTINEL {
            return Ok(Self::Unconstrained);
        }

        let value = u32::try_from(value).map_err(|_| {
            BitmapError::InvalidArgument(format!(
                "约束值非法：{}（应为正整数或 {} 表示不限制）",
                value, UNCONSTRAINED_SENTINEL
            ))
        })?;
        Self::limit(value)
    }
}

/// 调用方给出的约束组合，宽高在解码时从图片头读取。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SampleConstraints {
    pub min_side_length: Constraint,
    pub max_num_pixels: Constraint,
}

impl SampleConstraints {
    /// 从原始整数解析，`-1` 表示不限制。
    pub fn from_raw(min_side_length: i64, max_num_pixels: i64) -> Result<Self, BitmapError> {
        Ok(Self {
            min_side_length: Constraint::from_raw(min_side_length)?,
            max_num_pixels: Constraint::from_raw(max_num_pixels)?,
        })
    }
}

/// 一次采样率计算的输入。
///
/// 宽高在构造时校验为正数，之后的计算不会失败。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRequest {
    width: u32,
    height: u32,
    min_side_length: Constraint,
    max_num_pixels: Constraint,
}

impl SampleRequest {
    /// 以真实像素宽高创建请求，两个约束默认均为不限制。
    pub fn new(width: u32, height: u32) -> Result<Self, BitmapError> {
        if width == 0 || height == 0 {
            return Err(BitmapError::InvalidArgument(format!(
                "图片宽高必须为正数：{}x{}",
                width, height
            )));
        }

        Ok(Self {
            width,
            height,
            min_side_length: Constraint::Unconstrained,
            max_num_pixels: Constraint::Unconstrained,
        })
    }

    pub fn with_min_side_length(mut self, constraint: Constraint) -> Self {
        self.min_side_length = constraint;
        self
    }

    pub fn with_max_num_pixels(mut self, constraint: Constraint) -> Self {
        self.max_num_pixels = constraint;
        self
    }
}

/// 计算最终采样率（初始值 + 取整）。
///
/// # 示例
/// ```rust
/// use bitmap_kit::bitmap::{compute_sample_size, Constraint, SampleRequest};
///
/// let request = SampleRequest::new(4000, 3000)?
///     .with_max_num_pixels(Constraint::limit(720 * 480)?);
/// assert_eq!(compute_sample_size(&request), 8);
/// # Ok::<(), bitmap_kit::bitmap::BitmapError>(())
/// ```
pub fn compute_sample_size(request: &SampleRequest) -> u32 {
    round_sample_size(compute_initial_sample_size(request))
}

/// 以原始整数形式计算采样率，`-1` 表示对应约束不限制。
pub fn compute_sample_size_raw(
    width: i64,
    height: i64,
    min_side_length: i64,
    max_num_pixels: i64,
) -> Result<u32, BitmapError> {
    let to_dimension = |value: i64, name: &str| {
        u32::try_from(value)
            .map_err(|_| BitmapError::InvalidArgument(format!("{} 超出范围：{}", name, value)))
    };

    let request = SampleRequest::new(to_dimension(width, "width")?, to_dimension(height, "height")?)?
        .with_min_side_length(Constraint::from_raw(min_side_length)?)
        .with_max_num_pixels(Constraint::from_raw(max_num_pixels)?);

    Ok(compute_sample_size(&request))
}

/// 计算取整前的初始采样率。
///
/// 下界来自像素总数约束，上界来自最短边约束；上界小于下界时像素约束优先。
pub fn compute_initial_sample_size(request: &SampleRequest) -> u32 {
    let w = f64::from(request.width);
    let h = f64::from(request.height);

    let lower_bound = match request.max_num_pixels {
        Constraint::Unconstrained => 1,
        Constraint::Limit(max) => (w * h / f64::from(max.get())).sqrt().ceil() as u32,
    };
    let upper_bound = match request.min_side_length {
        Constraint::Unconstrained => DEFAULT_UPPER_BOUND,
        Constraint::Limit(min) => {
            let min = f64::from(min.get());
            (w / min).floor().min((h / min).floor()) as u32
        }
    };

    if upper_bound < lower_bound {
        return lower_bound;
    }

    match (request.min_side_length, request.max_num_pixels) {
        (Constraint::Unconstrained, Constraint::Unconstrained) => 1,
        (Constraint::Unconstrained, Constraint::Limit(_)) => lower_bound,
        _ => upper_bound,
    }
}

/// 对初始采样率取整：≤ 8 取不小于它的 2 的幂，> 8 取不小于它的 8 的倍数。
pub fn round_sample_size(initial: u32) -> u32 {
    if initial <= POWER_OF_TWO_LIMIT {
        return initial.max(1).next_power_of_two();
    }

    let rounded = (u64::from(initial) + 7) / 8 * 8;
    // 仅在宽高接近 u32 上限时才会溢出，退回到可表示的最大 8 的倍数
    u32::try_from(rounded).unwrap_or(u32::MAX & !7)
}
