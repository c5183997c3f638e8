//! RPeak Eval Tool
//!
//! 心电R峰检测算法评估工具：将检测器输出与人工标注的R峰进行容差窗口匹配，
//! 计算灵敏度、阳性预测值和JF综合评分，并在受试者 × 条件 × 检测方法上批量扫描。
//!
//! ## 核心特性
//! - 成对计数匹配：TP = 距离严格小于容差窗口的 (标注, 检测) 对数
//! - 最少检测数门限（默认10），门限以下的运行不进入结果表
//! - JF综合评分：一对一匹配准确率 × 抖动因子
//! - 平均RR间期的 Lin 一致性相关系数
//! - rayon并行扫描，输出与串行模式完全一致

pub mod core;
pub mod error;
pub mod processing;
pub mod recording;
pub mod tools;

// 重新导出核心类型
pub use core::{EventSequence, JfScore, MatchResult, PeakMatcher, ToleranceWindow};
pub use error::{ErrorCategory, EvalError, EvalResult};
pub use processing::{ScoreRecord, ScoreTable, SweepReport, run_sweep};
pub use recording::{
    Condition, DetectionSource, DetectorMethod, DetectorRegistry, JsonRecordingStore,
    PeakDetector, Recording, RecordingKey, RecordingSource, Setup, StoredDetections,
};
