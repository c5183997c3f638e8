//! JF综合评分
//!
//! 将检测准确度（事件层面的 Jaccard 指数）与时间抖动合成为单一分数，
//! 作为比较检测方法的主要排序依据。
//!
//! - 匹配：排序后双指针一对一最近邻匹配，偏差不超过最大延迟
//! - 准确度 A = matched / (matched + missed + extra)
//! - 抖动 = 匹配偏差的中位数绝对偏差（秒）
//! - J = 1 / (1 + jitter / 12ms)，JF = J × A ∈ [0, 1]
//!
//! 与 `peak_matcher` 的成对计数不同，这里每个事件最多匹配一次。
//! 检测数极少甚至为空时返回确定的低分，不报错。

use super::events::EventSequence;
use crate::error::{EvalError, EvalResult, calculation_error};
use crate::tools::constants::scoring;
use serde::{Deserialize, Serialize};

/// JF评分结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JfScore {
    /// 综合评分（0-1）
    pub jf: f64,
    /// 事件层面 Jaccard 指数
    pub accuracy: f64,
    /// 匹配偏差的中位数绝对偏差（秒）
    pub jitter_seconds: f64,
    pub matched: usize,
    pub missed: usize,
    pub extra: usize,
}

impl JfScore {
    /// 百分制评分（结果表使用）
    #[inline]
    pub fn jf_percent(&self) -> f64 {
        self.jf * 100.0
    }
}

/// 计算 JF 综合评分
///
/// `max_lag_seconds` 为 `None` 时使用默认最大延迟。
pub fn combined_score(
    reference: &EventSequence,
    candidate: &EventSequence,
    sampling_rate: f64,
    max_lag_seconds: Option<f64>,
) -> EvalResult<JfScore> {
    if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
        return Err(EvalError::InvalidInput(format!(
            "JF评分采样率无效 / invalid sampling rate for JF score: {sampling_rate}"
        )));
    }
    let max_lag = max_lag_seconds.unwrap_or(scoring::JF_DEFAULT_MAX_LAG_SECONDS);
    if !(max_lag.is_finite() && max_lag > 0.0) {
        return Err(EvalError::InvalidInput(format!(
            "JF最大延迟无效 / invalid JF max lag: {max_lag}"
        )));
    }

    let mut reference_sorted = reference.as_slice().to_vec();
    reference_sorted.sort_unstable();
    let mut candidate_sorted = candidate.as_slice().to_vec();
    candidate_sorted.sort_unstable();

    let max_lag_samples = max_lag * sampling_rate;
    let offsets = match_one_to_one(&reference_sorted, &candidate_sorted, max_lag_samples);

    let matched = offsets.len();
    let missed = reference_sorted.len() - matched;
    let extra = candidate_sorted.len() - matched;

    let total = matched + missed + extra;
    let accuracy = if total == 0 {
        0.0
    } else {
        matched as f64 / total as f64
    };

    let offsets_seconds: Vec<f64> = offsets.iter().map(|&o| o / sampling_rate).collect();
    let jitter_seconds = median_absolute_deviation(&offsets_seconds).unwrap_or(0.0);

    let j = 1.0 / (1.0 + jitter_seconds / scoring::JF_NORM_JITTER_SECONDS);
    let jf = j * accuracy;
    if !jf.is_finite() {
        return Err(calculation_error(
            "JF评分 / JF score",
            format!("non-finite score (jitter {jitter_seconds} s)"),
        ));
    }

    Ok(JfScore {
        jf,
        accuracy,
        jitter_seconds,
        matched,
        missed,
        extra,
    })
}

/// 双指针一对一最近邻匹配，返回每个匹配的偏差（候选 - 参考，采样点）
///
/// 找到延迟内的配对后，若下一个候选离当前参考更近，或下一个参考离当前候选更近，
/// 则前移对应指针，被越过的事件分别计为多检或漏检。
fn match_one_to_one(reference: &[u64], candidate: &[u64], max_lag_samples: f64) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(reference.len().min(candidate.len()));
    let mut i = 0usize;
    let mut j = 0usize;

    while i < reference.len() && j < candidate.len() {
        let r = reference[i];
        let c = candidate[j];
        if r.abs_diff(c) as f64 > max_lag_samples {
            if c < r {
                j += 1;
            } else {
                i += 1;
            }
            continue;
        }

        // 每次前移都严格缩小配对距离，结果仍在延迟内
        loop {
            let distance = reference[i].abs_diff(candidate[j]);
            if j + 1 < candidate.len() && reference[i].abs_diff(candidate[j + 1]) < distance {
                j += 1;
            } else if i + 1 < reference.len() && reference[i + 1].abs_diff(candidate[j]) < distance
            {
                i += 1;
            } else {
                break;
            }
        }

        offsets.push(candidate[j] as f64 - reference[i] as f64);
        i += 1;
        j += 1;
    }

    offsets
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

fn median_absolute_deviation(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    let center = median(&mut sorted)?;
    let mut deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&mut deviations)
}
