//! 命令行接口模块
//!
//! 负责命令行参数解析、配置合并和程序信息展示。
//! 配置优先级：命令行参数 > `--config` JSON文件 > 默认值。

use super::config::EvaluationConfig;
use super::formatter::OutputFormat;
use crate::error::{EvalError, EvalResult};
use crate::recording::{Condition, DetectorMethod, Setup};
use clap::Parser;
use std::path::PathBuf;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

#[derive(Parser, Debug)]
#[command(name = "rpeak-eval")]
#[command(about = "R峰检测器评估工具 / R-peak detector evaluation tool")]
#[command(version)]
pub struct Cli {
    /// 录音库根目录（包含 einthoven/ 和 chest_strap/ 子目录）
    /// Recording store root (contains einthoven/ and chest_strap/)
    #[arg(value_name = "STORE_DIR")]
    pub store_root: PathBuf,

    /// JSON配置文件
    /// JSON configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// 导联方式：einthoven, chest_strap（逗号分隔）
    /// Setups: einthoven, chest_strap (comma separated)
    #[arg(long = "setup", value_delimiter = ',')]
    pub setups: Vec<String>,

    /// 受试者编号，例如 "0-24" 或 "1,3,5"（默认自动发现）
    /// Subject ids, e.g. "0-24" or "1,3,5" (discovered by default)
    #[arg(long)]
    pub subjects: Option<String>,

    /// 实验条件（逗号分隔）
    /// Conditions (comma separated)
    #[arg(long = "condition", value_delimiter = ',')]
    pub conditions: Vec<String>,

    /// 检测方法（逗号分隔）
    /// Detector methods (comma separated)
    #[arg(long = "method", value_delimiter = ',')]
    pub methods: Vec<String>,

    /// 容差窗口（秒，默认0.1）
    /// Tolerance window in seconds (default: 0.1)
    #[arg(long)]
    pub tolerance_seconds: Option<f64>,

    /// 最少检测数（默认10）
    /// Minimum detection count (default: 10)
    #[arg(long)]
    pub min_detections: Option<usize>,

    /// JF评分最大延迟（秒）
    /// JF score max lag in seconds
    #[arg(long)]
    pub jf_max_lag: Option<f64>,

    /// 覆盖录音采样率（Hz）
    /// Override recording sampling rate (Hz)
    #[arg(long)]
    pub sampling_rate: Option<f64>,

    /// 串行模式
    /// Serial mode
    #[arg(long, conflicts_with = "parallel")]
    pub serial: bool,

    /// 并行度
    /// Parallel degree
    #[arg(long, short = 'j')]
    pub parallel: Option<usize>,

    /// 结果输出目录
    /// Output directory
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,

    /// 控制台输出格式：table, markdown, json
    /// Console format: table, markdown, json
    #[arg(long, short = 'f', default_value = "table")]
    pub format: OutputFormat,

    /// 不写出结果文件
    /// Do not write result files
    #[arg(long)]
    pub no_export: bool,

    /// 显示详细处理信息
    /// Verbose output
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

/// 应用程序配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 录音库根目录
    pub store_root: PathBuf,

    /// 评估配置
    pub evaluation: EvaluationConfig,

    /// 控制台输出格式
    pub format: OutputFormat,

    /// 是否写出CSV/JSON/汇总文件
    pub export: bool,

    /// 是否显示详细信息
    pub verbose: bool,
}

impl AppConfig {
    /// 合并命令行参数与配置文件，未知标识快速失败
    pub fn from_cli(cli: Cli) -> EvalResult<Self> {
        let mut evaluation = match &cli.config {
            Some(path) => EvaluationConfig::load(path)?,
            None => EvaluationConfig::default(),
        };

        if !cli.setups.is_empty() {
            evaluation.setups = parse_list::<Setup>(&cli.setups)?;
        }
        if !cli.conditions.is_empty() {
            evaluation.conditions = parse_list::<Condition>(&cli.conditions)?;
        }
        if !cli.methods.is_empty() {
            evaluation.methods = parse_list::<DetectorMethod>(&cli.methods)?;
        }
        if let Some(subjects) = &cli.subjects {
            evaluation.subjects = parse_subjects(subjects)?;
        }
        if let Some(seconds) = cli.tolerance_seconds {
            evaluation.tolerance_seconds = seconds;
        }
        if let Some(minimum) = cli.min_detections {
            evaluation.min_detections = minimum;
        }
        if cli.jf_max_lag.is_some() {
            evaluation.jf_max_lag_seconds = cli.jf_max_lag;
        }
        if cli.sampling_rate.is_some() {
            evaluation.sampling_rate = cli.sampling_rate;
        }
        if cli.serial {
            evaluation.parallel_degree = None;
        } else if cli.parallel.is_some() {
            evaluation.parallel_degree = cli.parallel;
        }
        if let Some(dir) = cli.output_dir {
            evaluation.output_dir = dir;
        }

        evaluation.validate()?;

        Ok(Self {
            store_root: cli.store_root,
            evaluation,
            format: cli.format,
            export: !cli.no_export,
            verbose: cli.verbose,
        })
    }
}

/// 解析标识列表，保持顺序并去重
fn parse_list<T>(values: &[String]) -> EvalResult<Vec<T>>
where
    T: std::str::FromStr<Err = EvalError> + PartialEq,
{
    let mut parsed = Vec::with_capacity(values.len());
    for value in values.iter().filter(|v| !v.trim().is_empty()) {
        let item = value.parse::<T>()?;
        if !parsed.contains(&item) {
            parsed.push(item);
        }
    }
    Ok(parsed)
}

/// 解析受试者编号：支持 "0-24"、"1,3,5" 及混合写法，结果排序去重
pub fn parse_subjects(spec: &str) -> EvalResult<Vec<u32>> {
    let invalid = |part: &str| {
        EvalError::InvalidInput(format!(
            "无效的受试者编号 / invalid subject spec '{part}'"
        ))
    };

    let mut subjects = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start.trim().parse().map_err(|_| invalid(part))?;
                let end: u32 = end.trim().parse().map_err(|_| invalid(part))?;
                if start > end {
                    return Err(invalid(part));
                }
                subjects.extend(start..=end);
            }
            None => subjects.push(part.parse().map_err(|_| invalid(part))?),
        }
    }

    if subjects.is_empty() {
        return Err(invalid(spec));
    }

    subjects.sort_unstable();
    subjects.dedup();
    Ok(subjects)
}

/// 解析命令行参数并创建配置
pub fn parse_args() -> EvalResult<AppConfig> {
    AppConfig::from_cli(Cli::parse())
}

/// 显示程序启动信息
pub fn show_startup_info(config: &AppConfig) {
    println!("[INFO] rpeak-eval v{VERSION} 启动 / starting");
    println!("[INFO] {DESCRIPTION}");
    println!(
        "[INFO] 录音库 / Store: {}",
        config.store_root.display()
    );

    let evaluation = &config.evaluation;
    if config.verbose {
        let setups: Vec<&str> = evaluation.setups.iter().map(|s| s.as_str()).collect();
        let conditions: Vec<&str> = evaluation.conditions.iter().map(|c| c.as_str()).collect();
        let methods: Vec<&str> = evaluation.methods.iter().map(|m| m.as_str()).collect();
        println!("   导联 / Setups: {}", setups.join(", "));
        println!("   条件 / Conditions: {}", conditions.join(", "));
        println!("   方法 / Methods: {}", methods.join(", "));
        println!(
            "   容差 / Tolerance: {} s, 最少检测数 / Minimum detections: {}",
            evaluation.tolerance_seconds, evaluation.min_detections
        );
        match evaluation.parallel_degree {
            Some(degree) => println!("   并行度 / Parallelism: {degree}"),
            None => println!("   串行模式 / Serial mode"),
        }
    }
    println!();
}

/// 显示程序完成信息
pub fn show_completion_info(config: &AppConfig) {
    if config.verbose {
        println!("[OK] 所有任务处理完成 / All tasks completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["rpeak-eval", "/data/store"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn test_parse_subjects() {
        assert_eq!(parse_subjects("0-4").unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(parse_subjects("5, 1,3").unwrap(), vec![1, 3, 5]);
        assert_eq!(parse_subjects("0-2,2,10").unwrap(), vec![0, 1, 2, 10]);
        assert!(parse_subjects("4-1").is_err());
        assert!(parse_subjects("a").is_err());
        assert!(parse_subjects("").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_cli(cli(&[])).unwrap();
        assert_eq!(config.store_root, PathBuf::from("/data/store"));
        assert_eq!(config.evaluation, EvaluationConfig::default());
        assert_eq!(config.format, OutputFormat::Table);
        assert!(config.export);
        assert!(!config.verbose);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_cli(cli(&[
            "--setup",
            "chest_strap",
            "--method",
            "pan_tompkins,hamilton,pan-tompkins",
            "--condition",
            "jogging",
            "--subjects",
            "0-2",
            "--min-detections",
            "5",
            "--serial",
            "--format",
            "json",
        ]))
        .unwrap();

        let evaluation = &config.evaluation;
        assert_eq!(evaluation.setups, vec![Setup::ChestStrap]);
        assert_eq!(
            evaluation.methods,
            vec![DetectorMethod::PanTompkins, DetectorMethod::Hamilton]
        );
        assert_eq!(evaluation.conditions, vec![Condition::Jogging]);
        assert_eq!(evaluation.subjects, vec![0, 1, 2]);
        assert_eq!(evaluation.min_detections, 5);
        assert_eq!(evaluation.parallel_degree, None);
        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn test_unknown_setup_fails_fast() {
        let result = AppConfig::from_cli(cli(&["--setup", "holter"]));
        assert!(matches!(result, Err(EvalError::InvalidInput(_))));
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        let result = AppConfig::from_cli(cli(&["--tolerance-seconds", "0"]));
        assert!(matches!(result, Err(EvalError::InvalidInput(_))));
    }
}
