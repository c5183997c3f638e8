//! 汇总统计与一致性分析
//!
//! 跨录音的均值/标准差汇总，以及 Lin 一致性相关系数（CCC）。

use serde::{Deserialize, Serialize};

/// 一组数值的汇总统计
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    /// 样本标准差 (n-1)
    pub std_dev: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl SummaryStats {
    /// 计算汇总统计，NaN 值不参与计算
    pub fn from_values(values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return Self {
                count: 0,
                mean: 0.0,
                std_dev: 0.0,
                median: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;

        let variance = if sorted.len() > 1 {
            sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };

        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median = if sorted.len() % 2 == 0 {
            let mid = sorted.len() / 2;
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[sorted.len() / 2]
        };

        Self {
            count: sorted.len(),
            mean,
            std_dev: variance.sqrt(),
            median,
            min: sorted.first().copied().unwrap_or(0.0),
            max: sorted.last().copied().unwrap_or(0.0),
        }
    }
}

/// Lin 一致性相关系数
///
/// ρc = 2·s_xy / (s_x² + s_y² + (x̄ - ȳ)²)，使用总体矩（除以 n）。
/// 长度不一致、少于两对数据或总方差为零时返回 `None`。
pub fn lin_ccc(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let var_x = x.iter().map(|v| (v - mean_x).powi(2)).sum::<f64>() / n;
    let var_y = y.iter().map(|v| (v - mean_y).powi(2)).sum::<f64>() / n;
    let covariance = x
        .iter()
        .zip(y)
        .map(|(a, b)| (a - mean_x) * (b - mean_y))
        .sum::<f64>()
        / n;

    let denominator = var_x + var_y + (mean_x - mean_y).powi(2);
    if denominator <= f64::EPSILON {
        return None;
    }

    Some(2.0 * covariance / denominator)
}
