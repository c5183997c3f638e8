//! 结果导出测试
//!
//! CSV评分表、失败检测表、JSON报告和汇总文本的写出与回读。

mod recording_fixtures;

use recording_fixtures::{RecordingFixtures, beats};
use rpeak_eval_tool::processing::run_sweep;
use rpeak_eval_tool::recording::{
    Condition, DetectorMethod, RecordingKey, Setup, StoredDetections,
};
use rpeak_eval_tool::tools::{EvaluationConfig, ExportedReport, analysis_view, write_outputs};
use std::fs;

fn log(msg_zh: impl AsRef<str>, msg_en: impl AsRef<str>) {
    println!("{} / {}", msg_zh.as_ref(), msg_en.as_ref());
}

fn sweep_fixture() -> (RecordingFixtures, EvaluationConfig) {
    let fixtures = RecordingFixtures::new();
    for setup in Setup::ALL {
        for condition in [Condition::Sitting, Condition::Jogging] {
            for subject in 0..3 {
                fixtures.write_standard(setup, subject, condition);
            }
        }
    }
    // 一条录音缺少标注
    fixtures.write(
        RecordingKey::new(Setup::ChestStrap, 3, Condition::Sitting),
        None,
        &[(DetectorMethod::Hamilton, beats(30, 100, 200))],
    );

    let config = EvaluationConfig {
        subjects: vec![0, 1, 2, 3],
        conditions: vec![Condition::Sitting, Condition::Jogging],
        methods: vec![DetectorMethod::Hamilton, DetectorMethod::Engzee],
        parallel_degree: Some(2),
        ..Default::default()
    };
    (fixtures, config)
}

#[test]
fn test_write_outputs_creates_all_files() {
    let (fixtures, config) = sweep_fixture();
    let report = run_sweep(&config, fixtures.store(), &StoredDetections::all(), false).unwrap();

    let out = tempfile::tempdir().unwrap();
    let written = write_outputs(&report, &config, out.path()).unwrap();

    // 每个导联两份CSV + 时长表 + JSON报告 + 汇总文本
    assert_eq!(written.len(), 7);
    for path in &written {
        assert!(path.exists(), "缺少输出文件 / missing output {}", path.display());
    }

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert!(names.contains(&"sensitivity_jf_einthoven.csv".to_string()));
    assert!(names.contains(&"sensitivity_jf_chest_strap.csv".to_string()));
    assert!(names.contains(&"detector_fail_table_einthoven.csv".to_string()));
    assert!(names.contains(&"durations.csv".to_string()));
    assert!(names.contains(&"evaluation_report.json".to_string()));
    assert!(names.iter().any(|n| n.starts_with("evaluation_summary_")));
    log(format!("写出 {} 个文件", written.len()), format!("{} files written", written.len()));
}

#[test]
fn test_scores_csv_keeps_every_scored_row() {
    let (fixtures, config) = sweep_fixture();
    let report = run_sweep(&config, fixtures.store(), &StoredDetections::all(), false).unwrap();

    let out = tempfile::tempdir().unwrap();
    write_outputs(&report, &config, out.path()).unwrap();

    // 逐录音CSV不做汇总过滤：线缆导联的 jogging 也写出
    let einthoven = fs::read_to_string(out.path().join("sensitivity_jf_einthoven.csv")).unwrap();
    let rows: Vec<&str> = einthoven.lines().skip(1).collect();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows.iter().filter(|r| r.contains(",jogging,hamilton,")).count(), 3);

    // 胸带：engzee 已被门限排除，jogging 保留
    let chest = fs::read_to_string(out.path().join("sensitivity_jf_chest_strap.csv")).unwrap();
    assert_eq!(chest.lines().skip(1).count(), 6);
    assert!(chest.contains(",jogging,hamilton,"));

    // 失败检测表：engzee 9/30
    let fails =
        fs::read_to_string(out.path().join("detector_fail_table_einthoven.csv")).unwrap();
    let fail_rows: Vec<&str> = fails.lines().skip(1).collect();
    assert_eq!(fail_rows.len(), 6);
    assert!(fail_rows.iter().all(|r| r.contains(",engzee,9,30,30")));
}

#[test]
fn test_json_report_round_trip() {
    let (fixtures, config) = sweep_fixture();
    let report = run_sweep(&config, fixtures.store(), &StoredDetections::all(), false).unwrap();

    let out = tempfile::tempdir().unwrap();
    write_outputs(&report, &config, out.path()).unwrap();

    let loaded = ExportedReport::load(&out.path().join("evaluation_report.json")).unwrap();
    assert_eq!(loaded.config, config);
    assert_eq!(loaded.records.len(), report.table.len());
    for (a, b) in loaded.records.records().iter().zip(report.table.records()) {
        assert_eq!(
            (a.setup, a.subject, a.condition, a.method),
            (b.setup, b.subject, b.condition, b.method)
        );
        assert_eq!(a.true_positives, b.true_positives);
        assert_eq!(a.sensitivity, b.sensitivity);
    }
    // 受试者3：缺少标注1条，文件缺失3条
    assert_eq!(loaded.skipped.len(), 4);
    assert!(loaded.skipped.iter().all(|s| s.key.subject == 3));
    // 汇总使用过滤视图：线缆导联 jogging 不参与
    assert_eq!(loaded.summary.len(), analysis_view(&report.table).summarize().len());
    assert_eq!(loaded.summary.len(), 3);
    assert!(loaded.summary.iter().all(|s| s.method == DetectorMethod::Hamilton));
    assert!(
        !loaded
            .summary
            .iter()
            .any(|s| s.setup == Setup::Einthoven && s.condition == Condition::Jogging)
    );
    assert_eq!(loaded.records.len(), 12);
    assert_eq!(loaded.durations.len(), 13);
}

#[test]
fn test_summary_text_reports_skips() {
    let (fixtures, config) = sweep_fixture();
    let report = run_sweep(&config, fixtures.store(), &StoredDetections::all(), false).unwrap();

    let out = tempfile::tempdir().unwrap();
    let written = write_outputs(&report, &config, out.path()).unwrap();
    let summary_path = written
        .iter()
        .find(|p| p.to_string_lossy().contains("evaluation_summary_"))
        .unwrap();
    let text = fs::read_to_string(summary_path).unwrap();

    assert!(text.contains("Skipped recordings: 4"));
    assert!(text.contains("Excluded runs: 12"));
    assert!(text.contains("chest_strap / subject 3 / sitting"));
    assert!(text.contains("Annotated recordings: 12 / 13"));
}

#[test]
fn test_durations_csv_lists_loaded_recordings() {
    let (fixtures, config) = sweep_fixture();
    let report = run_sweep(&config, fixtures.store(), &StoredDetections::all(), false).unwrap();

    let out = tempfile::tempdir().unwrap();
    write_outputs(&report, &config, out.path()).unwrap();

    let csv = fs::read_to_string(out.path().join("durations.csv")).unwrap();
    let rows: Vec<&str> = csv.lines().skip(1).collect();
    // 12 条标准录音 + 1 条缺少标注的录音；文件缺失的录音不出现
    assert_eq!(rows.len(), 13);
    assert!(rows.contains(&"einthoven,0,sitting,10,true"));
    assert!(rows.contains(&"chest_strap,3,sitting,10,false"));
    log(
        format!("{} 条录音有时长记录", rows.len()),
        format!("{} recordings have duration rows", rows.len()),
    );
}

#[test]
fn test_corrupted_report_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("evaluation_report.json");
    fs::write(&path, "[1, 2, 3]").unwrap();

    let err = ExportedReport::load(&path).unwrap_err();
    assert!(matches!(
        err,
        rpeak_eval_tool::error::EvalError::FormatError(_)
    ));
}
