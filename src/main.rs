//! RPeak Eval Tool - 主程序入口
//!
//! 纯流程控制器，负责协调各个工具模块完成R峰检测评估扫描。

use rpeak_eval_tool::{
    error::{ErrorCategory, EvalError},
    processing::run_sweep,
    recording::{JsonRecordingStore, StoredDetections},
    tools::{self, AppConfig},
};
use std::collections::BTreeSet;
use std::process;

/// 错误退出码定义
mod exit_codes {
    /// 通用错误
    pub const GENERAL_ERROR: i32 = 1;
    /// 配置/格式错误
    pub const FORMAT_ERROR: i32 = 2;
    /// 数据错误（缺少标注等）
    pub const DATA_ERROR: i32 = 3;
    /// 计算错误
    pub const CALCULATION_ERROR: i32 = 4;
    /// 资源/并发错误
    pub const RESOURCE_ERROR: i32 = 5;
}

/// 获取错误建议文本
fn get_error_suggestion(error: &EvalError) -> &'static str {
    // 优先通过具体错误类型匹配，提供更精确的建议
    match error {
        EvalError::InvalidInput(_) => {
            "检查命令行参数或配置文件，使用 --help 查看完整用法 / Check command-line arguments or config file, use --help to see full usage"
        }
        EvalError::ResourceError(_) => {
            "资源不可用，请重试；若持续失败请使用 --serial 串行模式 / Resource unavailable, retry; if it keeps failing, use --serial"
        }
        _ => match ErrorCategory::from_eval_error(error) {
            ErrorCategory::Io => {
                "检查录音库路径是否正确，目录是否存在且可读 / Check the store path exists and is readable"
            }
            ErrorCategory::Format => {
                "录音文件应为 <root>/<setup>/subject_NN_<condition>.json / Recordings must be <root>/<setup>/subject_NN_<condition>.json"
            }
            ErrorCategory::Data => {
                "录音缺少标注或检测结果过少 / Recording lacks annotation or has too few detections"
            }
            ErrorCategory::Calculation => {
                "计算过程出现异常，请检查事件序列和采样率 / Calculation error, check event sequences and sampling rate"
            }
            ErrorCategory::Other => {
                "请检查输入数据和参数设置 / Please check input data and parameter settings"
            }
        },
    }
}

/// 错误处理和建议
fn handle_error(error: EvalError) -> ! {
    eprintln!("[ERROR] 错误 / Error: {error}");
    eprintln!("[INFO] 建议 / Suggestion: {}", get_error_suggestion(&error));

    let exit_code = match &error {
        EvalError::InvalidInput(_) => exit_codes::FORMAT_ERROR,
        EvalError::ResourceError(_) => exit_codes::RESOURCE_ERROR,
        _ => match ErrorCategory::from_eval_error(&error) {
            ErrorCategory::Format => exit_codes::FORMAT_ERROR,
            ErrorCategory::Data => exit_codes::DATA_ERROR,
            ErrorCategory::Calculation => exit_codes::CALCULATION_ERROR,
            ErrorCategory::Io | ErrorCategory::Other => exit_codes::GENERAL_ERROR,
        },
    };

    process::exit(exit_code);
}

/// 受试者列表为空时从录音库目录发现（各导联方式的并集）
fn resolve_subjects(config: &mut AppConfig) -> Result<(), EvalError> {
    if !config.evaluation.subjects.is_empty() {
        return Ok(());
    }

    let mut subjects = BTreeSet::new();
    for &setup in &config.evaluation.setups {
        let found = tools::discover_subjects(&config.store_root, setup)?;
        tools::show_discovery_results(&config.store_root, setup, &found, config.verbose);
        subjects.extend(found);
    }

    config.evaluation.subjects = subjects.into_iter().collect();
    Ok(())
}

/// 应用程序主逻辑（便于测试和复用）
fn run() -> Result<(), EvalError> {
    // 1. 解析命令行参数（未知标识在此快速失败）
    let mut config = tools::parse_args()?;

    // 2. 显示启动信息
    tools::show_startup_info(&config);

    // 3. 确定受试者
    resolve_subjects(&mut config)?;
    if config.evaluation.subjects.is_empty() {
        println!("[WARNING] 录音库中没有可评估的录音 / No recordings found in store");
        return Ok(());
    }

    // 4. 扫描评估
    let store = JsonRecordingStore::new(&config.store_root);
    let detections = StoredDetections::new(config.evaluation.methods.clone());
    let report = run_sweep(&config.evaluation, &store, &detections, config.verbose)?;

    // 5. 输出结果
    tools::print_report(&report, &config.evaluation, config.format)?;

    let written = if config.export {
        tools::write_outputs(&report, &config.evaluation, &config.evaluation.output_dir)?
    } else {
        Vec::new()
    };
    tools::show_sweep_completion_info(&report, &written, config.verbose);
    tools::show_completion_info(&config);

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        handle_error(error);
    }
}
