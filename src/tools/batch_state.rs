//! 批处理状态管理模块
//!
//! 提供统一的扫描统计管理，支持串行和并行两种模式。

use crate::error::ErrorCategory;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 扫描统计快照
///
/// 包含评估成功/跳过计数和错误分类统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStatsSnapshot {
    /// 成功评估的录音数
    pub processed: usize,
    /// 跳过或排除的条目数（录音或单个检测方法）
    pub failed: usize,
    /// 错误分类统计（错误类型 -> 条目标签列表，已排序）
    pub error_stats: BTreeMap<ErrorCategory, Vec<String>>,
}

impl BatchStatsSnapshot {
    /// 某类别下的条目数
    pub fn count(&self, category: ErrorCategory) -> usize {
        self.error_stats.get(&category).map_or(0, Vec::len)
    }
}

fn sorted_snapshot(
    processed: usize,
    failed: usize,
    mut error_stats: BTreeMap<ErrorCategory, Vec<String>>,
) -> BatchStatsSnapshot {
    // 并行模式下写入顺序不确定，快照统一排序
    for labels in error_stats.values_mut() {
        labels.sort();
    }
    BatchStatsSnapshot {
        processed,
        failed,
        error_stats,
    }
}

/// 串行批处理统计（单线程）
#[derive(Debug, Default)]
pub struct SerialBatchStats {
    processed: usize,
    failed: usize,
    error_stats: BTreeMap<ErrorCategory, Vec<String>>,
}

impl SerialBatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inc_processed(&mut self) -> usize {
        self.processed += 1;
        self.processed
    }

    /// 增加失败计数并记录错误分类
    #[inline]
    pub fn inc_failed(&mut self, category: ErrorCategory, label: String) -> usize {
        self.failed += 1;
        self.error_stats.entry(category).or_default().push(label);
        self.failed
    }

    pub fn snapshot(&self) -> BatchStatsSnapshot {
        sorted_snapshot(self.processed, self.failed, self.error_stats.clone())
    }
}

/// 并行批处理统计（多线程安全）
///
/// 使用原子类型和锁，适用于rayon工作线程直接更新
#[derive(Debug, Clone)]
pub struct ParallelBatchStats {
    processed: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    error_stats: Arc<Mutex<BTreeMap<ErrorCategory, Vec<String>>>>,
}

impl ParallelBatchStats {
    pub fn new() -> Self {
        Self {
            processed: Arc::new(AtomicUsize::new(0)),
            failed: Arc::new(AtomicUsize::new(0)),
            error_stats: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    #[inline]
    pub fn inc_processed(&self) -> usize {
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 增加失败计数并记录错误分类（线程安全）
    pub fn inc_failed(&self, category: ErrorCategory, label: String) -> usize {
        let count = self.failed.fetch_add(1, Ordering::Relaxed) + 1;

        if let Ok(mut stats) = self.error_stats.lock() {
            stats.entry(category).or_default().push(label);
        }

        count
    }

    pub fn snapshot(&self) -> BatchStatsSnapshot {
        sorted_snapshot(
            self.processed.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            self.error_stats
                .lock()
                .map(|stats| stats.clone())
                .unwrap_or_default(),
        )
    }
}

impl Default for ParallelBatchStats {
    fn default() -> Self {
        Self::new()
    }
}
