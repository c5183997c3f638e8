//! R峰匹配与检测质量指标
//!
//! 参考序列（人工标注）与候选序列（检测器输出）之间的容差窗口匹配。
//!
//! ## 计数语义
//!
//! TP 统计的是**距离严格小于窗口的 (参考, 候选) 对数**，而不是一对一匹配。
//! 一个参考R峰附近有两个候选R峰时会贡献 2 个 TP。历史结果表都按这一定义
//! 计算，跨结果比较依赖它，因此不改为贪心或最优二分匹配。
//!
//! 由此 `FP = len(candidate) - TP`、`FN = len(reference) - TP` 在成对重复时
//! 可能为负，计数使用有符号整数保持恒等式成立。

use super::events::{EventSequence, ToleranceWindow};
use serde::{Deserialize, Serialize};

/// 单次匹配结果（纯函数输出，不持久化）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// 窗口内的 (参考, 候选) 对数
    pub true_positives: i64,
    /// len(candidate) - TP
    pub false_positives: i64,
    /// len(reference) - TP
    pub false_negatives: i64,
}

impl MatchResult {
    /// 灵敏度 TP / (TP + FN)，参考序列为空时返回 NaN
    pub fn sensitivity(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_negatives,
        )
    }

    /// 阳性预测值 TP / (TP + FP)，候选序列为空时返回 NaN
    pub fn positive_predictivity(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_positives,
        )
    }

    /// 是否存在重复计数（某个事件与多个对侧事件同时配对）
    pub fn has_duplicate_pairs(&self) -> bool {
        self.false_positives < 0 || self.false_negatives < 0
    }
}

#[inline]
fn ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        f64::NAN
    } else {
        numerator as f64 / denominator as f64
    }
}

/// 统计参考与候选事件之间窗口内的配对数
///
/// 等价于构建完整的两两距离矩阵后计数 `|r - c| < W` 的元素。
/// 两侧都排序后用二分查找定位每个参考事件的候选区间，结果与矩阵计数一致。
pub fn count_pairs_within(reference: &[u64], candidate: &[u64], window: ToleranceWindow) -> i64 {
    if reference.is_empty() || candidate.is_empty() {
        return 0;
    }

    let mut sorted = candidate.to_vec();
    sorted.sort_unstable();

    // |r - c| < W  <=>  r - W < c < r + W
    let w = window.samples();
    reference
        .iter()
        .map(|&r| {
            // 以减法表达边界，事件接近 u64::MAX 时不溢出
            let lower = r
                .checked_sub(w)
                .map_or(0, |floor| sorted.partition_point(|&c| c <= floor));
            let upper = sorted.partition_point(|&c| c < r || c - r < w);
            (upper - lower) as i64
        })
        .sum()
}

/// 计算参考序列与候选序列的匹配结果
pub fn match_events(
    reference: &EventSequence,
    candidate: &EventSequence,
    window: ToleranceWindow,
) -> MatchResult {
    let true_positives = count_pairs_within(reference.as_slice(), candidate.as_slice(), window);

    MatchResult {
        true_positives,
        false_positives: candidate.len() as i64 - true_positives,
        false_negatives: reference.len() as i64 - true_positives,
    }
}

/// 绑定固定容差窗口的匹配器
#[derive(Debug, Clone, Copy)]
pub struct PeakMatcher {
    window: ToleranceWindow,
}

impl PeakMatcher {
    pub fn new(window: ToleranceWindow) -> Self {
        Self { window }
    }

    #[inline]
    pub fn window(&self) -> ToleranceWindow {
        self.window
    }

    pub fn evaluate(&self, reference: &EventSequence, candidate: &EventSequence) -> MatchResult {
        match_events(reference, candidate, self.window)
    }
}
