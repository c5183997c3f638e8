//! 评估配置
//!
//! 受试者列表、条件列表、检测方法、采样率、容差、输出路径集中在一个结构中，
//! 显式传入扫描入口。可从JSON文件加载，命令行参数再覆盖其中的字段。

use super::constants::{defaults, parallel_limits, scoring};
use crate::error::{EvalError, EvalResult, format_error};
use crate::recording::{Condition, DetectorMethod, RecordingKey, Setup};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 评估扫描配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationConfig {
    /// 导联方式
    pub setups: Vec<Setup>,

    /// 受试者编号，为空时从录音库目录自动发现
    pub subjects: Vec<u32>,

    /// 实验条件
    pub conditions: Vec<Condition>,

    /// 检测方法
    pub methods: Vec<DetectorMethod>,

    /// 覆盖录音自带的采样率（Hz）
    pub sampling_rate: Option<f64>,

    /// 容差窗口（秒）
    pub tolerance_seconds: f64,

    /// 最少检测数门限
    pub min_detections: usize,

    /// JF评分最大延迟（秒），None 使用默认值
    pub jf_max_lag_seconds: Option<f64>,

    /// 并行度，None 表示串行
    pub parallel_degree: Option<usize>,

    /// 结果输出目录
    pub output_dir: PathBuf,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            setups: Setup::ALL.to_vec(),
            subjects: Vec::new(),
            conditions: Condition::ALL.to_vec(),
            methods: DetectorMethod::ALL.to_vec(),
            sampling_rate: None,
            tolerance_seconds: scoring::TOLERANCE_WINDOW_SECONDS,
            min_detections: scoring::MIN_DETECTIONS,
            jf_max_lag_seconds: None,
            parallel_degree: Some(defaults::PARALLEL_DEGREE),
            output_dir: PathBuf::from(defaults::OUTPUT_DIR),
        }
    }
}

impl EvaluationConfig {
    /// 从JSON文件加载，缺省字段使用默认值
    pub fn load(path: &Path) -> EvalResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| format_error(&format!("配置文件 / config {}", path.display()), e))?;
        config.validate()?;
        Ok(config)
    }

    /// 配置合法性检查（不合法属于编程/配置错误，快速失败）
    pub fn validate(&self) -> EvalResult<()> {
        if self.setups.is_empty() {
            return Err(invalid("导联方式列表为空 / no setups configured"));
        }
        if self.conditions.is_empty() {
            return Err(invalid("实验条件列表为空 / no conditions configured"));
        }
        if self.methods.is_empty() {
            return Err(invalid("检测方法列表为空 / no detector methods configured"));
        }
        if !(self.tolerance_seconds.is_finite() && self.tolerance_seconds > 0.0) {
            return Err(invalid(&format!(
                "容差窗口必须为正 / tolerance must be positive: {}",
                self.tolerance_seconds
            )));
        }
        if let Some(fs) = self.sampling_rate
            && !(fs.is_finite() && fs > 0.0)
        {
            return Err(invalid(&format!(
                "采样率必须为正 / sampling rate must be positive: {fs}"
            )));
        }
        if let Some(lag) = self.jf_max_lag_seconds
            && !(lag.is_finite() && lag > 0.0)
        {
            return Err(invalid(&format!(
                "JF最大延迟必须为正 / JF max lag must be positive: {lag}"
            )));
        }
        if let Some(degree) = self.parallel_degree
            && !(parallel_limits::MIN_PARALLEL_DEGREE..=parallel_limits::MAX_PARALLEL_DEGREE)
                .contains(&degree)
        {
            return Err(invalid(&format!(
                "并行度超出范围 / parallel degree out of range [{}, {}]: {degree}",
                parallel_limits::MIN_PARALLEL_DEGREE,
                parallel_limits::MAX_PARALLEL_DEGREE
            )));
        }
        Ok(())
    }

    /// 某导联方式下的扫描任务（受试者 × 条件，有序）
    pub fn keys_for(&self, setup: Setup, subjects: &[u32]) -> Vec<RecordingKey> {
        subjects
            .iter()
            .flat_map(|&subject| {
                self.conditions
                    .iter()
                    .map(move |&condition| RecordingKey::new(setup, subject, condition))
            })
            .collect()
    }

    /// 默认受试者编号 0..25
    pub fn default_subjects() -> Vec<u32> {
        (0..defaults::SUBJECT_COUNT).collect()
    }
}

fn invalid(msg: &str) -> EvalError {
    EvalError::InvalidInput(msg.to_string())
}
