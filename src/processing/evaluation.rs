//! 单条录音的评估
//!
//! 对每个检测方法：记录检测数 → 最少检测数门限 → 成对匹配评分 + JF评分。
//! 门限以下的运行视为"该方法在此录音上失败"，不进入结果表。

use super::score_table::{DetectionCount, RecordingDuration, ScoreRecord};
use crate::core::{EventSequence, PeakMatcher, ToleranceWindow, combined_score};
use crate::error::{EvalError, EvalResult};
use crate::recording::{DetectionSource, DetectorMethod, Recording, RecordingKey, RecordingSource};
use crate::tools::config::EvaluationConfig;

/// 评估参数（从配置中提取，跨线程只读共享）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationParams {
    pub tolerance_seconds: f64,
    pub min_detections: usize,
    pub jf_max_lag_seconds: Option<f64>,
    /// 覆盖录音自带的采样率
    pub sampling_rate_override: Option<f64>,
}

impl EvaluationParams {
    /// 生效采样率：配置覆盖优先，否则使用录音自带的采样率
    #[inline]
    pub fn sampling_rate_for(&self, recording: &Recording) -> f64 {
        self.sampling_rate_override
            .unwrap_or(recording.sampling_rate)
    }
}

impl From<&EvaluationConfig> for EvaluationParams {
    fn from(config: &EvaluationConfig) -> Self {
        Self {
            tolerance_seconds: config.tolerance_seconds,
            min_detections: config.min_detections,
            jf_max_lag_seconds: config.jf_max_lag_seconds,
            sampling_rate_override: config.sampling_rate,
        }
    }
}

/// 最少检测数门限：检测数 >= minimum 才参与评分
pub fn check_detection_count(detected: usize, minimum: usize) -> EvalResult<()> {
    if detected >= minimum {
        Ok(())
    } else {
        Err(EvalError::DegenerateDetection { detected, minimum })
    }
}

/// 单个检测方法的评估结果
#[derive(Debug)]
pub struct DetectionOutcome {
    pub count: DetectionCount,
    /// 门限以下为 `Err(DegenerateDetection)`
    pub record: EvalResult<ScoreRecord>,
}

/// 评估一个检测方法在一条录音上的输出
pub fn evaluate_detection(
    recording: &Recording,
    method: DetectorMethod,
    detected: &EventSequence,
    params: &EvaluationParams,
) -> EvalResult<DetectionOutcome> {
    let annotated = recording.require_annotation()?;
    let sampling_rate = params.sampling_rate_for(recording);
    let key = recording.key;

    let count = DetectionCount {
        setup: key.setup,
        subject: key.subject,
        condition: key.condition,
        method,
        detected: detected.len(),
        annotated: annotated.len(),
    };

    if let Err(e) = check_detection_count(detected.len(), params.min_detections) {
        return Ok(DetectionOutcome {
            count,
            record: Err(e),
        });
    }

    let window = ToleranceWindow::from_seconds(sampling_rate, params.tolerance_seconds)?;
    let matched = PeakMatcher::new(window).evaluate(annotated, detected);
    let jf = combined_score(annotated, detected, sampling_rate, params.jf_max_lag_seconds)?;

    let record = ScoreRecord {
        setup: key.setup,
        subject: key.subject,
        condition: key.condition,
        method,
        detected_count: detected.len(),
        annotated_count: annotated.len(),
        sensitivity: defined(matched.sensitivity()),
        positive_predictivity: defined(matched.positive_predictivity()),
        true_positives: matched.true_positives,
        false_positives: matched.false_positives,
        false_negatives: matched.false_negatives,
        jf_percent: jf.jf_percent(),
        mean_rr_detected: detected.mean_rr_seconds(sampling_rate),
        mean_rr_annotated: annotated.mean_rr_seconds(sampling_rate),
    };

    Ok(DetectionOutcome {
        count,
        record: Ok(record),
    })
}

#[inline]
fn defined(value: f64) -> Option<f64> {
    if value.is_nan() { None } else { Some(value) }
}

/// 检测器在某录音上运行失败
#[derive(Debug)]
pub struct DetectorFailure {
    pub method: DetectorMethod,
    pub error: EvalError,
}

/// 一条录音上所有检测方法的评估结果
#[derive(Debug, Default)]
pub struct RecordingEvaluation {
    pub outcomes: Vec<DetectionOutcome>,
    pub failures: Vec<DetectorFailure>,
}

/// 录音时长与标注可用性（缺少标注的录音也会记录）
pub fn describe_recording(recording: &Recording, params: &EvaluationParams) -> RecordingDuration {
    let key = recording.key;
    RecordingDuration {
        setup: key.setup,
        subject: key.subject,
        condition: key.condition,
        duration_seconds: recording.duration_seconds(params.sampling_rate_for(recording)),
        annotated: recording.has_annotation(),
    }
}

/// 加载录音并评估所有检测方法
///
/// 录音加载失败或缺少标注时整条录音返回错误（可恢复，由调用方记录并跳过）。
/// 单个检测方法失败只记入 `failures`，不影响其他方法。
pub fn evaluate_recording(
    key: &RecordingKey,
    source: &dyn RecordingSource,
    detections: &dyn DetectionSource,
    methods: &[DetectorMethod],
    params: &EvaluationParams,
) -> EvalResult<RecordingEvaluation> {
    let recording = source.load(key)?;
    evaluate_loaded(&recording, detections, methods, params)
}

/// 评估已加载录音上的所有检测方法
pub fn evaluate_loaded(
    recording: &Recording,
    detections: &dyn DetectionSource,
    methods: &[DetectorMethod],
    params: &EvaluationParams,
) -> EvalResult<RecordingEvaluation> {
    recording.require_annotation()?;

    let mut evaluation = RecordingEvaluation::default();
    for &method in methods {
        let outcome = detections
            .detect(method, recording)
            .and_then(|detected| evaluate_detection(recording, method, &detected, params));

        match outcome {
            Ok(outcome) => evaluation.outcomes.push(outcome),
            Err(error) => evaluation.failures.push(DetectorFailure { method, error }),
        }
    }

    Ok(evaluation)
}
