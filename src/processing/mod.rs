//! 评估流程模块
//!
//! 单条录音评估、类型化结果表，以及受试者 × 条件 × 检测方法的批量扫描。

pub mod evaluation;
pub mod score_table;
pub mod sweep;

// 重新导出公共接口
pub use evaluation::{
    DetectionOutcome, DetectorFailure, EvaluationParams, RecordingEvaluation,
    check_detection_count, describe_recording, evaluate_detection, evaluate_loaded,
    evaluate_recording,
};
pub use score_table::{
    ConcordanceRow, DetectionCount, MethodSummary, RecordingDuration, ScoreRecord, ScoreTable,
};
pub use sweep::{ExcludedRun, SkippedRecording, SweepReport, run_sweep};
