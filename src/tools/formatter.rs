//! 输出格式化模块
//!
//! 控制台汇总表（comfy-table）、CSV导出、JSON报告和带时间戳的扫描汇总文本。
//! 结果表只在这里转换为表格/列式格式。

use super::config::EvaluationConfig;
use super::utils::{self, format as fmt_num};
use crate::error::{EvalResult, format_error};
use crate::processing::{
    ConcordanceRow, DetectionCount, ExcludedRun, MethodSummary, RecordingDuration, ScoreTable,
    SkippedRecording, SweepReport,
};
use crate::recording::{Condition, DetectorMethod, Setup};
use chrono::Local;
use comfy_table::{
    Cell, CellAlignment, ContentArrangement, Table,
    presets::{ASCII_MARKDOWN, UTF8_FULL},
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CSV评分表表头
const SCORES_CSV_HEADER: &str = "subject,condition,method,detected,annotated,sensitivity,positive_predictivity,tp,fp,fn,jf,mean_rr_detected,mean_rr_annotated";

/// CSV失败检测表表头
const FAIL_CSV_HEADER: &str = "subject,condition,method,detected,annotated,percentage";

/// CSV录音时长表表头
const DURATIONS_CSV_HEADER: &str = "setup,subject,condition,duration_seconds,annotated";

/// 控制台输出格式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Markdown,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {s}")),
        }
    }
}

// ============================================================================
// JSON报告
// ============================================================================

/// 导出的完整评估报告（score-compare 的输入）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedReport {
    pub tool_version: String,
    pub generated_at: String,
    pub config: EvaluationConfig,
    pub records: ScoreTable,
    pub summary: Vec<MethodSummary>,
    pub concordance: Vec<ConcordanceRow>,
    pub detection_counts: Vec<DetectionCount>,
    pub excluded: Vec<ExcludedRun>,
    pub skipped: Vec<SkippedRecording>,
    #[serde(default)]
    pub durations: Vec<RecordingDuration>,
}

impl ExportedReport {
    pub fn from_sweep(config: &EvaluationConfig, report: &SweepReport) -> Self {
        let analysis = analysis_view(&report.table);
        Self {
            tool_version: VERSION.to_string(),
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            config: config.clone(),
            records: report.table.clone(),
            summary: analysis.summarize(),
            concordance: analysis.concordance(),
            detection_counts: report.detection_counts.clone(),
            excluded: report.excluded.clone(),
            skipped: report.skipped.clone(),
            durations: report.durations.clone(),
        }
    }

    pub fn save(&self, path: &Path) -> EvalResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> EvalResult<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| format_error(&format!("评估报告 / report {}", path.display()), e))
    }
}

// ============================================================================
// 控制台表格
// ============================================================================

fn new_table(format: OutputFormat) -> Table {
    let mut table = Table::new();
    match format {
        OutputFormat::Markdown => table.load_preset(ASCII_MARKDOWN),
        _ => table.load_preset(UTF8_FULL),
    };
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

#[inline]
fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// 各 (导联, 方法, 条件) 的灵敏度、阳性预测值、JF汇总表
pub fn summary_table(summary: &[MethodSummary], format: OutputFormat) -> Table {
    let mut table = new_table(format);
    table.set_header(vec![
        "Setup / 导联",
        "Method / 方法",
        "Condition / 条件",
        "N",
        "Se mean",
        "Se SD",
        "+P mean",
        "JF mean (%)",
        "JF SD",
        "JF median",
    ]);

    for row in summary {
        table.add_row(vec![
            Cell::new(row.setup.as_str()),
            Cell::new(row.method.display_name()),
            Cell::new(row.condition.as_str()),
            right(row.jf_percent.count.to_string()),
            right(format!("{:.3}", row.sensitivity.mean)),
            right(format!("{:.3}", row.sensitivity.std_dev)),
            right(format!("{:.3}", row.positive_predictivity.mean)),
            right(format!("{:.2}", row.jf_percent.mean)),
            right(format!("{:.2}", row.jf_percent.std_dev)),
            right(format!("{:.2}", row.jf_percent.median)),
        ]);
    }

    table
}

/// 平均RR间期一致性（Lin CCC）表
pub fn concordance_table(rows: &[ConcordanceRow], format: OutputFormat) -> Table {
    let mut table = new_table(format);
    table.set_header(vec![
        "Setup / 导联",
        "Method / 方法",
        "Condition / 条件",
        "Pairs",
        "CCC (mean RR)",
    ]);

    for row in rows {
        table.add_row(vec![
            Cell::new(row.setup.as_str()),
            Cell::new(row.method.display_name()),
            Cell::new(row.condition.as_str()),
            right(row.pairs.to_string()),
            right(fmt_num::optional(row.ccc, 3)),
        ]);
    }

    table
}

/// 检测数低于门限的运行列表
pub fn fail_table(counts: &[DetectionCount], minimum: usize, format: OutputFormat) -> Table {
    let mut table = new_table(format);
    table.set_header(vec![
        "Setup / 导联",
        "Subject / 受试者",
        "Condition / 条件",
        "Method / 方法",
        "Detected",
        "Annotated",
        "%",
    ]);

    for count in counts.iter().filter(|c| c.detected < minimum) {
        table.add_row(vec![
            Cell::new(count.setup.as_str()),
            right(count.subject.to_string()),
            Cell::new(count.condition.as_str()),
            Cell::new(count.method.display_name()),
            right(count.detected.to_string()),
            right(count.annotated.to_string()),
            right(fmt_num::optional(count.percentage(), 1)),
        ]);
    }

    table
}

/// 在控制台输出扫描结果
pub fn print_report(
    report: &SweepReport,
    config: &EvaluationConfig,
    format: OutputFormat,
) -> EvalResult<()> {
    if format == OutputFormat::Json {
        let exported = ExportedReport::from_sweep(config, report);
        println!("{}", serde_json::to_string_pretty(&exported)?);
        return Ok(());
    }

    if report.table.is_empty() {
        println!("[WARNING] 没有可汇总的评分记录 / No scored records to summarize");
    } else {
        let analysis = analysis_view(&report.table);
        println!("{}", summary_table(&analysis.summarize(), format));
        println!();
        println!("{}", concordance_table(&analysis.concordance(), format));
    }

    let degenerate = report
        .detection_counts
        .iter()
        .filter(|c| c.detected < config.min_detections)
        .count();
    if degenerate > 0 {
        println!();
        println!(
            "[INFO] 检测数少于 {} 的运行 / Runs with fewer than {} detections: {degenerate}",
            config.min_detections, config.min_detections
        );
        println!(
            "{}",
            fail_table(&report.detection_counts, config.min_detections, format)
        );
    }

    Ok(())
}

/// 汇总视图：胸带数据不含 Engzee，线缆导联不含 jogging
///
/// 只用于汇总表和一致性表，逐录音CSV与JSON记录保持完整。
pub fn analysis_view(table: &ScoreTable) -> ScoreTable {
    let mut view = ScoreTable::with_capacity(table.len());
    for setup in Setup::ALL {
        let setup_view = table.for_setup(setup);
        let kept = match setup {
            Setup::ChestStrap => setup_view.without_method(DetectorMethod::Engzee),
            Setup::Einthoven => setup_view.without_condition(Condition::Jogging),
        };
        view.extend(kept.records().iter().cloned());
    }
    view.sort_stable();
    view
}

// ============================================================================
// CSV导出
// ============================================================================

/// 评分表转为CSV文本
pub fn scores_csv(table: &ScoreTable) -> String {
    let mut output = String::with_capacity((table.len() + 1) * 96);
    output.push_str(SCORES_CSV_HEADER);
    output.push('\n');

    for r in table.records() {
        output.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{}\n",
            r.subject,
            r.condition,
            r.method,
            r.detected_count,
            r.annotated_count,
            fmt_num::csv_optional(r.sensitivity),
            fmt_num::csv_optional(r.positive_predictivity),
            r.true_positives,
            r.false_positives,
            r.false_negatives,
            r.jf_percent,
            fmt_num::csv_optional(r.mean_rr_detected),
            fmt_num::csv_optional(r.mean_rr_annotated),
        ));
    }

    output
}

/// 检测数低于门限的运行转为CSV文本
pub fn fail_table_csv(counts: &[DetectionCount], setup: Setup, minimum: usize) -> String {
    let mut output = String::from(FAIL_CSV_HEADER);
    output.push('\n');

    for c in counts
        .iter()
        .filter(|c| c.setup == setup && c.detected < minimum)
    {
        output.push_str(&format!(
            "{},{},{},{},{},{}\n",
            c.subject,
            c.condition,
            c.method,
            c.detected,
            c.annotated,
            fmt_num::csv_optional(c.percentage()),
        ));
    }

    output
}

/// 录音时长与标注可用性转为CSV文本
pub fn durations_csv(durations: &[RecordingDuration]) -> String {
    let mut output = String::from(DURATIONS_CSV_HEADER);
    output.push('\n');

    for d in durations {
        output.push_str(&format!(
            "{},{},{},{},{}\n",
            d.setup, d.subject, d.condition, d.duration_seconds, d.annotated,
        ));
    }

    output
}

/// 扫描汇总文本（带时间戳）
pub fn summary_text(report: &SweepReport, config: &EvaluationConfig) -> String {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S");
    let stats = &report.stats;
    let mut output = String::new();

    output.push_str("=====================================\n");
    output.push_str("   R-Peak Detector Evaluation Report\n");
    output.push_str("   R峰检测评估汇总\n");
    output.push_str("=====================================\n\n");
    output.push_str(&format!("生成工具 / Tool: rpeak-eval v{VERSION}\n"));
    output.push_str(&format!("日期 / Date: {now}\n"));

    let setups: Vec<&str> = config.setups.iter().map(|s| s.as_str()).collect();
    output.push_str(&format!("导联 / Setups: {}\n", setups.join(", ")));
    output.push_str(&format!(
        "容差窗口 / Tolerance: {} s\n",
        config.tolerance_seconds
    ));
    output.push_str(&format!(
        "最少检测数 / Minimum detections: {}\n\n",
        config.min_detections
    ));

    output.push_str("扫描统计 / Sweep statistics:\n");
    output.push_str(&format!(
        "   录音总数 / Recordings: {}\n",
        report.total_recordings()
    ));
    output.push_str(&format!("   成功评估 / Evaluated: {}\n", stats.processed));
    output.push_str(&format!(
        "   跳过录音 / Skipped recordings: {}\n",
        report.skipped.len()
    ));
    output.push_str(&format!(
        "   排除运行 / Excluded runs: {}\n",
        report.excluded.len()
    ));
    output.push_str(&format!("   评分记录 / Scored records: {}\n", report.table.len()));
    let annotated = report.durations.iter().filter(|d| d.annotated).count();
    output.push_str(&format!(
        "   有标注录音 / Annotated recordings: {annotated} / {}\n",
        report.durations.len()
    ));
    let total_seconds: f64 = report.durations.iter().map(|d| d.duration_seconds).sum();
    output.push_str(&format!(
        "   信号总时长 / Total signal duration: {:.1} min\n",
        total_seconds / 60.0
    ));
    output.push_str(&format!(
        "   成功率 / Success rate: {}\n",
        fmt_num::percent(stats.processed, report.total_recordings())
    ));

    if !stats.error_stats.is_empty() {
        output.push_str("\n按类别 / By category:\n");
        for (category, labels) in &stats.error_stats {
            output.push_str(&format!(
                "   {}: {}\n",
                category.display_name(),
                labels.len()
            ));
            for label in labels {
                output.push_str(&format!("      - {label}\n"));
            }
        }
    }

    output
}

/// 写出所有结果文件，返回生成的文件路径
pub fn write_outputs(
    report: &SweepReport,
    config: &EvaluationConfig,
    output_dir: &Path,
) -> EvalResult<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    for &setup in &config.setups {
        let scores_path = output_dir.join(format!("sensitivity_jf_{setup}.csv"));
        fs::write(&scores_path, scores_csv(&report.table.for_setup(setup)))?;
        written.push(scores_path);

        let fail_path = output_dir.join(format!("detector_fail_table_{setup}.csv"));
        fs::write(
            &fail_path,
            fail_table_csv(&report.detection_counts, setup, config.min_detections),
        )?;
        written.push(fail_path);
    }

    let durations_path = output_dir.join("durations.csv");
    fs::write(&durations_path, durations_csv(&report.durations))?;
    written.push(durations_path);

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    let report_path = output_dir.join("evaluation_report.json");
    ExportedReport::from_sweep(config, report).save(&report_path)?;
    written.push(report_path);

    let summary_path = output_dir.join(format!("evaluation_summary_{timestamp}.txt"));
    fs::write(&summary_path, summary_text(report, config))?;
    written.push(summary_path);

    Ok(written)
}

/// 显示扫描完成信息
pub fn show_sweep_completion_info(report: &SweepReport, written: &[PathBuf], verbose: bool) {
    println!();
    println!("[INFO] 扫描完成 / Sweep complete");
    println!(
        "   成功评估 / Evaluated: {} / {} 条录音 / recordings",
        report.stats.processed,
        report.total_recordings()
    );
    if !report.skipped.is_empty() {
        println!("   跳过录音 / Skipped recordings: {}", report.skipped.len());
    }
    if !report.excluded.is_empty() {
        println!("   排除运行 / Excluded runs: {}", report.excluded.len());
    }
    for (category, labels) in &report.stats.error_stats {
        println!("      {}: {}", category.display_name(), labels.len());
    }

    println!();
    println!("[INFO] 生成的文件 / Generated files:");
    for path in written {
        if verbose {
            println!("   {}", path.display());
        } else {
            println!("   {}", utils::extract_filename_lossy(path));
        }
    }
}
