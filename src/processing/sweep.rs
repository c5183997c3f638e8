//! 受试者 × 条件 × 检测方法扫描
//!
//! 每条录音是独立任务，支持串行和rayon并行两种模式。
//! 并行结果携带任务索引，完成后按原顺序排序，两种模式输出完全一致。

use super::evaluation::{
    EvaluationParams, RecordingEvaluation, describe_recording, evaluate_loaded,
};
use super::score_table::{DetectionCount, RecordingDuration, ScoreTable};
use crate::error::{ErrorCategory, EvalError, EvalResult};
use crate::recording::{DetectionSource, DetectorMethod, RecordingKey, RecordingSource};
use crate::tools::batch_state::{BatchStatsSnapshot, ParallelBatchStats, SerialBatchStats};
use crate::tools::config::EvaluationConfig;
use crate::tools::utils;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// 整条录音被跳过（文件缺失、缺少标注、格式错误等）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRecording {
    pub key: RecordingKey,
    pub reason: String,
}

/// 单个检测方法在某录音上被排除（检测数过少或检测器失败）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedRun {
    pub key: RecordingKey,
    pub method: DetectorMethod,
    pub reason: String,
}

/// 扫描结果汇总
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// 通过门限的评分记录（已稳定排序）
    pub table: ScoreTable,
    /// 所有运行的检测数，包括被排除的
    pub detection_counts: Vec<DetectionCount>,
    pub excluded: Vec<ExcludedRun>,
    pub skipped: Vec<SkippedRecording>,
    /// 所有成功加载的录音（包括缺少标注的）
    pub durations: Vec<RecordingDuration>,
    pub stats: BatchStatsSnapshot,
}

impl SweepReport {
    /// 计划扫描的录音总数
    pub fn total_recordings(&self) -> usize {
        self.stats.processed + self.skipped.len()
    }
}

/// 有序结果容器（保证输出顺序）
struct OrderedResult {
    /// 原始任务索引（用于排序）
    index: usize,
    key: RecordingKey,
    /// 录音加载失败时为 None
    duration: Option<RecordingDuration>,
    result: EvalResult<RecordingEvaluation>,
}

/// 运行完整扫描
///
/// 配置错误（未注册的检测方法等）快速失败；单条录音或单个方法的失败只记录并继续。
pub fn run_sweep(
    config: &EvaluationConfig,
    source: &dyn RecordingSource,
    detections: &dyn DetectionSource,
    verbose: bool,
) -> EvalResult<SweepReport> {
    config.validate()?;
    check_methods_available(&config.methods, detections)?;

    let subjects = if config.subjects.is_empty() {
        EvaluationConfig::default_subjects()
    } else {
        config.subjects.clone()
    };
    let keys: Vec<RecordingKey> = config
        .setups
        .iter()
        .flat_map(|&setup| config.keys_for(setup, &subjects))
        .collect();
    let params = EvaluationParams::from(config);

    if keys.is_empty() {
        println!("[WARNING] 没有需要评估的录音 / No recordings to evaluate");
        return Ok(SweepReport::default());
    }

    match config.parallel_degree {
        None => Ok(sweep_serial(&keys, source, detections, &config.methods, &params, verbose)),
        Some(degree) => {
            let actual_degree = utils::effective_parallel_degree(degree, Some(keys.len()));
            if actual_degree == 1 {
                if verbose {
                    println!("[INFO] 并发度为1，使用串行模式 / Parallelism=1, using serial mode");
                }
                return Ok(sweep_serial(&keys, source, detections, &config.methods, &params, verbose));
            }

            sweep_parallel(
                &keys,
                source,
                detections,
                &config.methods,
                &params,
                actual_degree,
                verbose,
            )
            .or_else(|e| {
                eprintln!(
                    "[WARNING] 并行处理失败 / Parallel processing failed: {e}，回退到串行模式 / fallback to serial"
                );
                Ok(sweep_serial(&keys, source, detections, &config.methods, &params, verbose))
            })
        }
    }
}

fn check_methods_available(
    methods: &[DetectorMethod],
    detections: &dyn DetectionSource,
) -> EvalResult<()> {
    let available = detections.methods();
    let missing: Vec<&str> = methods
        .iter()
        .filter(|m| !available.contains(m))
        .map(|m| m.as_str())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(EvalError::InvalidInput(format!(
            "检测方法不可用 / detector methods unavailable: {}",
            missing.join(", ")
        )))
    }
}

/// 串行扫描
fn sweep_serial(
    keys: &[RecordingKey],
    source: &dyn RecordingSource,
    detections: &dyn DetectionSource,
    methods: &[DetectorMethod],
    params: &EvaluationParams,
    verbose: bool,
) -> SweepReport {
    let mut stats = SerialBatchStats::new();
    let mut results = Vec::with_capacity(keys.len());

    for (index, key) in keys.iter().enumerate() {
        if verbose {
            println!(
                "[PROCESSING] [{}/{}] 评估 / Evaluating: {key}",
                index + 1,
                keys.len()
            );
        }

        let (duration, result) = process_recording(key, source, detections, methods, params);

        if result.is_ok() {
            stats.inc_processed();
        }
        for (category, label) in failure_entries(key, &result) {
            stats.inc_failed(category, label);
        }

        log_outcome(index, keys.len(), key, &result, verbose);
        results.push(OrderedResult {
            index,
            key: *key,
            duration,
            result,
        });
    }

    assemble(results, stats.snapshot())
}

/// 并行扫描（rayon线程池，显式并发度）
fn sweep_parallel(
    keys: &[RecordingKey],
    source: &dyn RecordingSource,
    detections: &dyn DetectionSource,
    methods: &[DetectorMethod],
    params: &EvaluationParams,
    parallel_degree: usize,
    verbose: bool,
) -> EvalResult<SweepReport> {
    println!("[INFO] 启用并行评估 / Parallel evaluation: {parallel_degree} 并发度 / workers");

    let stats = ParallelBatchStats::new();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallel_degree)
        .thread_name(|i| format!("rpeak-worker-{i}"))
        .build()
        .map_err(|e| EvalError::ResourceError(format!("线程池创建失败: {e}")))?;

    let mut results: Vec<OrderedResult> = pool.install(|| {
        keys.par_iter()
            .enumerate()
            .map(|(index, key)| {
                // 简短进度提示（详细日志在排序后统一输出）
                if !verbose {
                    print!(".");
                    use std::io::Write;
                    std::io::stdout().flush().ok();
                }

                let (duration, result) =
                    process_recording(key, source, detections, methods, params);

                if result.is_ok() {
                    stats.inc_processed();
                }
                for (category, label) in failure_entries(key, &result) {
                    stats.inc_failed(category, label);
                }

                OrderedResult {
                    index,
                    key: *key,
                    duration,
                    result,
                }
            })
            .collect()
    });

    if !verbose {
        println!(); // 进度点换行
    }

    // 按原始顺序排序，日志输出与串行模式一致
    results.sort_by_key(|r| r.index);
    for r in &results {
        log_outcome(r.index, keys.len(), &r.key, &r.result, verbose);
    }

    Ok(assemble(results, stats.snapshot()))
}

/// 加载并评估一条录音，加载成功时同时返回时长记录
fn process_recording(
    key: &RecordingKey,
    source: &dyn RecordingSource,
    detections: &dyn DetectionSource,
    methods: &[DetectorMethod],
    params: &EvaluationParams,
) -> (Option<RecordingDuration>, EvalResult<RecordingEvaluation>) {
    match source.load(key) {
        Ok(recording) => (
            Some(describe_recording(&recording, params)),
            evaluate_loaded(&recording, detections, methods, params),
        ),
        Err(e) => (None, Err(e)),
    }
}

/// 一条录音结果中计入失败统计的条目（类别，标签）
fn failure_entries(
    key: &RecordingKey,
    result: &EvalResult<RecordingEvaluation>,
) -> Vec<(ErrorCategory, String)> {
    match result {
        Err(e) => vec![(ErrorCategory::from_eval_error(e), key.to_string())],
        Ok(evaluation) => {
            let excluded = evaluation.outcomes.iter().filter_map(|outcome| {
                outcome.record.as_ref().err().map(|e| {
                    (
                        ErrorCategory::from_eval_error(e),
                        format!("{key} / {}", outcome.count.method),
                    )
                })
            });
            let failed = evaluation.failures.iter().map(|failure| {
                (
                    ErrorCategory::from_eval_error(&failure.error),
                    format!("{key} / {}", failure.method),
                )
            });
            excluded.chain(failed).collect()
        }
    }
}

/// 输出单条录音的日志行：跳过/排除始终输出，成功仅在verbose模式输出
fn log_outcome(
    index: usize,
    total: usize,
    key: &RecordingKey,
    result: &EvalResult<RecordingEvaluation>,
    verbose: bool,
) {
    match result {
        Err(e) => {
            let category = ErrorCategory::from_eval_error(e);
            println!(
                "[SKIP] [{}/{}] {key} - [{}] {e} / 跳过",
                index + 1,
                total,
                category.display_name()
            );
            if verbose && let Some(source) = std::error::Error::source(e) {
                println!("      原因 / Cause: {source}");
            }
        }
        Ok(evaluation) => {
            for outcome in &evaluation.outcomes {
                if let Err(e) = &outcome.record {
                    println!(
                        "[SKIP] [{}/{}] {key} / {} - {e} / 排除",
                        index + 1,
                        total,
                        outcome.count.method.display_name()
                    );
                }
            }
            for failure in &evaluation.failures {
                println!(
                    "[FAIL] [{}/{}] {key} / {} - {} / 检测失败",
                    index + 1,
                    total,
                    failure.method.display_name(),
                    failure.error
                );
            }
            if verbose {
                // 配对计数下 FP/FN 为负说明同一标注被多个检测重复匹配
                let records = evaluation
                    .outcomes
                    .iter()
                    .filter_map(|o| o.record.as_ref().ok());
                for record in records {
                    if record.false_positives < 0 || record.false_negatives < 0 {
                        println!(
                            "[WARNING] {key} / {}: 重复配对 / duplicate pairs (FP={}, FN={})",
                            record.method.display_name(),
                            record.false_positives,
                            record.false_negatives
                        );
                    }
                }
                let scored = evaluation
                    .outcomes
                    .iter()
                    .filter(|o| o.record.is_ok())
                    .count();
                println!(
                    "   [OK] {key}: {scored}/{} 个方法计入评分 / methods scored",
                    evaluation.outcomes.len() + evaluation.failures.len()
                );
            }
        }
    }
}

/// 将有序结果组装为扫描报告
fn assemble(results: Vec<OrderedResult>, stats: BatchStatsSnapshot) -> SweepReport {
    let mut report = SweepReport {
        stats,
        ..SweepReport::default()
    };

    for ordered in results {
        let key = ordered.key;
        report.durations.extend(ordered.duration);
        match ordered.result {
            Err(e) => report.skipped.push(SkippedRecording {
                key,
                reason: e.to_string(),
            }),
            Ok(evaluation) => {
                for outcome in evaluation.outcomes {
                    let method = outcome.count.method;
                    report.detection_counts.push(outcome.count);
                    match outcome.record {
                        Ok(record) => report.table.push(record),
                        Err(e) => report.excluded.push(ExcludedRun {
                            key,
                            method,
                            reason: e.to_string(),
                        }),
                    }
                }
                for failure in evaluation.failures {
                    report.excluded.push(ExcludedRun {
                        key,
                        method: failure.method,
                        reason: failure.error.to_string(),
                    });
                }
            }
        }
    }

    report.table.sort_stable();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EventSequence;
    use crate::recording::{Condition, Recording, Setup};
    use std::collections::{BTreeMap, HashMap};

    /// 内存录音库
    struct MemorySource(HashMap<RecordingKey, Recording>);

    impl RecordingSource for MemorySource {
        fn load(&self, key: &RecordingKey) -> EvalResult<Recording> {
            self.0.get(key).cloned().ok_or_else(|| {
                EvalError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    key.to_string(),
                ))
            })
        }
    }

    fn beats(count: u64) -> EventSequence {
        EventSequence::from_vec((0..count).map(|i| 100 + i * 200).collect())
    }

    fn source() -> MemorySource {
        let mut recordings = HashMap::new();
        for subject in 0..3 {
            let key = RecordingKey::new(Setup::Einthoven, subject, Condition::Sitting);
            let mut detections = BTreeMap::new();
            detections.insert("hamilton".to_string(), beats(20));
            detections.insert("engzee".to_string(), beats(9));
            recordings.insert(
                key,
                Recording {
                    key,
                    sampling_rate: 250.0,
                    signal: Vec::new(),
                    // 受试者2缺少标注
                    annotation: (subject != 2).then(|| beats(20)),
                    detections,
                },
            );
        }
        MemorySource(recordings)
    }

    fn config(parallel_degree: Option<usize>) -> EvaluationConfig {
        EvaluationConfig {
            setups: vec![Setup::Einthoven],
            subjects: vec![0, 1, 2, 3],
            conditions: vec![Condition::Sitting],
            methods: vec![DetectorMethod::Hamilton, DetectorMethod::Engzee],
            parallel_degree,
            ..Default::default()
        }
    }

    #[test]
    fn test_serial_sweep_counts() {
        let report = run_sweep(
            &config(None),
            &source(),
            &crate::recording::StoredDetections::all(),
            false,
        )
        .unwrap();

        // 受试者0、1：hamilton 计入，engzee 被门限排除
        assert_eq!(report.table.len(), 2);
        assert_eq!(report.excluded.len(), 2);
        // 受试者2缺少标注，受试者3文件不存在
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.detection_counts.len(), 4);
        assert_eq!(report.stats.processed, 2);
        assert_eq!(report.stats.failed, 4);
        assert_eq!(report.stats.count(ErrorCategory::Io), 1);
        assert_eq!(report.stats.count(ErrorCategory::Data), 3);
        assert_eq!(report.total_recordings(), 4);

        // 缺少标注的录音仍记录时长，文件不存在的没有
        assert_eq!(report.durations.len(), 3);
        assert_eq!(report.durations.iter().filter(|d| d.annotated).count(), 2);
        assert!(!report.durations[2].annotated);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let detections = crate::recording::StoredDetections::all();
        let serial = run_sweep(&config(None), &source(), &detections, false).unwrap();
        let parallel = run_sweep(&config(Some(3)), &source(), &detections, false).unwrap();

        assert_eq!(serial.table, parallel.table);
        assert_eq!(serial.detection_counts, parallel.detection_counts);
        assert_eq!(serial.excluded, parallel.excluded);
        assert_eq!(serial.skipped, parallel.skipped);
        assert_eq!(serial.durations, parallel.durations);
        assert_eq!(serial.stats, parallel.stats);
    }

    #[test]
    fn test_unavailable_method_fails_fast() {
        let detections = crate::recording::StoredDetections::new(vec![DetectorMethod::Hamilton]);
        let result = run_sweep(&config(None), &source(), &detections, false);
        assert!(matches!(result, Err(EvalError::InvalidInput(_))));
    }
}
