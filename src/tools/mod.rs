//! 工具模块集合
//!
//! 包含CLI、配置、扫描、格式化等工具模块，支持main.rs的流程控制。

pub mod batch_state;
pub mod cli;
pub mod config;
pub mod constants;
pub mod formatter;
pub mod scanner;
pub mod utils;

// 重新导出主要的公共接口
pub use batch_state::{BatchStatsSnapshot, ParallelBatchStats, SerialBatchStats};
pub use cli::{AppConfig, Cli, parse_args, parse_subjects, show_completion_info, show_startup_info};
pub use config::EvaluationConfig;
pub use formatter::{
    ExportedReport, OutputFormat, analysis_view, durations_csv, fail_table_csv, print_report,
    scores_csv, show_sweep_completion_info, summary_text, write_outputs,
};
pub use scanner::{discover_subjects, show_discovery_results};
pub use utils::path;
