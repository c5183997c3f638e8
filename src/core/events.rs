//! 事件序列与容差窗口
//!
//! R峰以采样点索引表示，固定采样率下与时间一一对应。

use crate::error::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};

/// R峰事件序列（采样点索引）
///
/// 通常严格递增，但匹配算法把它当作点集处理，不强制要求单调。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventSequence(Vec<u64>);

impl EventSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(events: Vec<u64>) -> Self {
        Self(events)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u64> {
        self.0
    }

    /// 是否严格递增（录音文件校验使用）
    pub fn is_strictly_increasing(&self) -> bool {
        self.0.windows(2).all(|w| w[0] < w[1])
    }

    /// RR间期序列（秒），即间期速度图
    pub fn rr_intervals(&self, sampling_rate: f64) -> Vec<f64> {
        rr_intervals(self.as_slice(), sampling_rate)
    }

    /// 平均RR间期（秒），不足两个事件时返回 None
    pub fn mean_rr_seconds(&self, sampling_rate: f64) -> Option<f64> {
        let intervals = self.rr_intervals(sampling_rate);
        if intervals.is_empty() {
            None
        } else {
            Some(intervals.iter().sum::<f64>() / intervals.len() as f64)
        }
    }
}

impl From<Vec<u64>> for EventSequence {
    fn from(events: Vec<u64>) -> Self {
        Self(events)
    }
}

impl AsRef<[u64]> for EventSequence {
    fn as_ref(&self) -> &[u64] {
        &self.0
    }
}

/// 相邻事件间隔（秒）
///
/// 少于两个事件返回空序列。非递增输入按有符号差值计算。
pub fn rr_intervals(events: &[u64], sampling_rate: f64) -> Vec<f64> {
    events
        .windows(2)
        .map(|w| (w[1] as f64 - w[0] as f64) / sampling_rate)
        .collect()
}

/// 容差窗口（采样点数）
///
/// 两个事件距离严格小于窗口宽度时视为匹配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToleranceWindow(u64);

impl ToleranceWindow {
    /// 以采样点数创建，宽度必须为正
    pub fn from_samples(samples: u64) -> EvalResult<Self> {
        if samples == 0 {
            return Err(EvalError::InvalidInput(
                "容差窗口必须为正 / tolerance window must be positive".to_string(),
            ));
        }
        Ok(Self(samples))
    }

    /// 以秒为单位创建：W = floor(fs * seconds)
    pub fn from_seconds(sampling_rate: f64, seconds: f64) -> EvalResult<Self> {
        if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
            return Err(EvalError::InvalidInput(format!(
                "采样率无效 / invalid sampling rate: {sampling_rate}"
            )));
        }
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(EvalError::InvalidInput(format!(
                "容差时长无效 / invalid tolerance duration: {seconds}"
            )));
        }
        // 1e-9 吸收 0.1 等十进制时长的浮点表示误差
        Self::from_samples((sampling_rate * seconds + 1e-9).floor() as u64)
    }

    #[inline]
    pub fn samples(&self) -> u64 {
        self.0
    }

    /// 距离是否落在窗口内（严格小于）
    #[inline]
    pub fn contains(&self, distance: u64) -> bool {
        distance < self.0
    }
}
