//! score-compare - 评估报告 A/B 对比工具
//!
//! 读取两份 rpeak-eval 导出的 JSON 报告（evaluation_report.json），
//! 按 (导联, 方法, 条件) 对比平均JF评分与灵敏度。
//! 支持 Markdown、JSON、终端表格三种输出。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::Parser;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use rpeak_eval_tool::processing::MethodSummary;
use rpeak_eval_tool::recording::{Condition, DetectorMethod, Setup};
use rpeak_eval_tool::tools::{ExportedReport, OutputFormat};
use serde::{Deserialize, Serialize};

// ============================================================================
// CLI 定义
// ============================================================================

#[derive(Parser)]
#[command(name = "score-compare")]
#[command(about = "评估报告对比工具 / Evaluation report comparison tool")]
#[command(version)]
struct Cli {
    /// 基准报告
    /// Baseline report
    #[arg(long, short = 'b')]
    baseline: PathBuf,

    /// 候选报告
    /// Candidate report
    #[arg(long, short = 'c')]
    candidate: PathBuf,

    /// 只对比某导联方式
    /// Only compare one setup
    #[arg(long)]
    setup: Option<String>,

    /// 输出格式：markdown, json, table（默认markdown）
    /// Output format: markdown, json, table (default: markdown)
    #[arg(long, short = 'f', default_value = "markdown")]
    format: OutputFormat,
}

// ============================================================================
// 数据结构
// ============================================================================

/// 单个分组的对比结果
#[derive(Clone, Debug, Serialize, Deserialize)]
struct CompareRow {
    setup: Setup,
    method: DetectorMethod,
    condition: Condition,
    baseline_jf: Option<f64>,
    candidate_jf: Option<f64>,
    baseline_sensitivity: Option<f64>,
    candidate_sensitivity: Option<f64>,
}

impl CompareRow {
    fn jf_delta(&self) -> Option<f64> {
        Some(self.candidate_jf? - self.baseline_jf?)
    }

    fn sensitivity_delta(&self) -> Option<f64> {
        Some(self.candidate_sensitivity? - self.baseline_sensitivity?)
    }
}

/// A/B 对比报告
#[derive(Clone, Debug, Serialize, Deserialize)]
struct CompareReport {
    baseline: String,
    candidate: String,
    baseline_generated_at: String,
    candidate_generated_at: String,
    timestamp: String,
    rows: Vec<CompareRow>,
}

type GroupKey = (Setup, DetectorMethod, Condition);

// ============================================================================
// 对比
// ============================================================================

fn load_report(path: &Path) -> Result<ExportedReport> {
    ExportedReport::load(path)
        .with_context(|| format!("Failed to load report / 读取报告失败: {}", path.display()))
}

fn index_summary(summary: &[MethodSummary]) -> BTreeMap<GroupKey, &MethodSummary> {
    summary
        .iter()
        .map(|s| ((s.setup, s.method, s.condition), s))
        .collect()
}

/// 有记录时返回均值
fn defined_mean(count: usize, mean: f64) -> Option<f64> {
    (count > 0).then_some(mean)
}

fn build_rows(
    baseline: &ExportedReport,
    candidate: &ExportedReport,
    setup: Option<Setup>,
) -> Vec<CompareRow> {
    let base = index_summary(&baseline.summary);
    let cand = index_summary(&candidate.summary);

    let mut keys: Vec<GroupKey> = base.keys().chain(cand.keys()).copied().collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .filter(|(s, _, _)| setup.is_none_or(|wanted| wanted == *s))
        .map(|key| {
            let b = base.get(&key);
            let c = cand.get(&key);
            CompareRow {
                setup: key.0,
                method: key.1,
                condition: key.2,
                baseline_jf: b.and_then(|s| defined_mean(s.jf_percent.count, s.jf_percent.mean)),
                candidate_jf: c.and_then(|s| defined_mean(s.jf_percent.count, s.jf_percent.mean)),
                baseline_sensitivity: b
                    .and_then(|s| defined_mean(s.sensitivity.count, s.sensitivity.mean)),
                candidate_sensitivity: c
                    .and_then(|s| defined_mean(s.sensitivity.count, s.sensitivity.mean)),
            }
        })
        .collect()
}

// ============================================================================
// 输出格式化
// ============================================================================

fn opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.precision$}"))
}

fn delta(value: Option<f64>, precision: usize, emphasize: bool) -> String {
    match value {
        Some(d) if emphasize && d > 0.0 => format!("**{d:+.precision$}**"),
        Some(d) => format!("{d:+.precision$}"),
        None => "n/a".to_string(),
    }
}

fn compare_table(compare: &CompareReport, markdown: bool) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Setup / 导联",
        "Method / 方法",
        "Condition / 条件",
        "JF A (%)",
        "JF B (%)",
        "Delta JF",
        "Se A",
        "Se B",
        "Delta Se",
    ]);

    for row in &compare.rows {
        table.add_row(vec![
            Cell::new(row.setup.as_str()),
            Cell::new(row.method.display_name()),
            Cell::new(row.condition.as_str()),
            Cell::new(opt(row.baseline_jf, 2)).set_alignment(CellAlignment::Right),
            Cell::new(opt(row.candidate_jf, 2)).set_alignment(CellAlignment::Right),
            Cell::new(delta(row.jf_delta(), 2, markdown)).set_alignment(CellAlignment::Right),
            Cell::new(opt(row.baseline_sensitivity, 3)).set_alignment(CellAlignment::Right),
            Cell::new(opt(row.candidate_sensitivity, 3)).set_alignment(CellAlignment::Right),
            Cell::new(delta(row.sensitivity_delta(), 3, markdown))
                .set_alignment(CellAlignment::Right),
        ]);
    }

    table
}

/// 输出 A/B 对比报告 (Markdown)
fn output_markdown(compare: &CompareReport) {
    println!("## A/B Comparison Report / A/B 对比报告\n");
    println!("- **Timestamp / 时间戳**: {}", compare.timestamp);
    println!(
        "- **Baseline / 基准**: {} ({})",
        compare.baseline, compare.baseline_generated_at
    );
    println!(
        "- **Candidate / 候选**: {} ({})\n",
        compare.candidate, compare.candidate_generated_at
    );

    println!("### Comparison / 对比\n");
    println!("{}", compare_table(compare, true));
}

/// 输出终端表格格式
fn output_table(compare: &CompareReport) {
    println!("A/B Comparison Report / A/B 对比报告");
    println!("================================");
    println!("Baseline / 基准: {}", compare.baseline);
    println!("Candidate / 候选: {}", compare.candidate);
    println!("Timestamp / 时间戳: {}\n", compare.timestamp);
    println!("{}", compare_table(compare, false));
}

/// 输出 JSON 格式
fn output_json(compare: &CompareReport) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(compare).context("Failed to serialize / 序列化失败")?
    );
    Ok(())
}

// ============================================================================
// 主函数
// ============================================================================

fn main() -> Result<()> {
    let cli = Cli::parse();

    let setup = cli
        .setup
        .as_deref()
        .map(str::parse::<Setup>)
        .transpose()
        .context("Invalid --setup / 导联方式无效")?;

    let baseline = load_report(&cli.baseline)?;
    let candidate = load_report(&cli.candidate)?;

    if baseline.config.tolerance_seconds != candidate.config.tolerance_seconds {
        eprintln!(
            "[WARNING] 两份报告容差窗口不同 / Tolerance differs: {} s vs {} s",
            baseline.config.tolerance_seconds, candidate.config.tolerance_seconds
        );
    }

    let rows = build_rows(&baseline, &candidate, setup);
    if rows.is_empty() {
        bail!("No comparable groups / 没有可对比的分组");
    }

    let compare = CompareReport {
        baseline: cli.baseline.display().to_string(),
        candidate: cli.candidate.display().to_string(),
        baseline_generated_at: baseline.generated_at.clone(),
        candidate_generated_at: candidate.generated_at.clone(),
        timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        rows,
    };

    match cli.format {
        OutputFormat::Markdown => output_markdown(&compare),
        OutputFormat::Json => output_json(&compare)?,
        OutputFormat::Table => output_table(&compare),
    }

    Ok(())
}
