//! 录音数据库读取
//!
//! 每条录音提供采样率、原始电压序列、人工标注R峰（可能缺失），
//! 以及可选的已存储检测结果（按检测方法名索引）。
//!
//! 磁盘布局：`<root>/<setup>/subject_<NN>_<condition>.json`

use super::setup::RecordingKey;
use crate::core::EventSequence;
use crate::error::{EvalError, EvalResult, format_error};
use crate::tools::constants::defaults;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 单条ECG录音
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub key: RecordingKey,

    /// 采样率（Hz），缺省为数据库采样率
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,

    /// 原始电压序列
    #[serde(default)]
    pub signal: Vec<f64>,

    /// 人工标注R峰，不是每条录音都有
    #[serde(default)]
    pub annotation: Option<EventSequence>,

    /// 已存储的检测结果（检测方法名 -> R峰序列）
    #[serde(default)]
    pub detections: BTreeMap<String, EventSequence>,
}

fn default_sampling_rate() -> f64 {
    defaults::SAMPLING_RATE_HZ
}

impl Recording {
    /// 按给定采样率计算的信号时长（秒）
    pub fn duration_seconds(&self, sampling_rate: f64) -> f64 {
        if sampling_rate > 0.0 {
            self.signal.len() as f64 / sampling_rate
        } else {
            0.0
        }
    }

    #[inline]
    pub fn has_annotation(&self) -> bool {
        self.annotation.is_some()
    }

    /// 返回人工标注，缺失时给出可恢复的 MissingAnnotation 错误
    pub fn require_annotation(&self) -> EvalResult<&EventSequence> {
        self.annotation
            .as_ref()
            .ok_or_else(|| EvalError::MissingAnnotation(self.key.to_string()))
    }

    /// 校验采样率与标注单调性
    ///
    /// 已存储检测结果在回放时按方法单独校验，单个方法的坏数据不影响整条录音。
    pub fn validate(&self) -> EvalResult<()> {
        if !(self.sampling_rate.is_finite() && self.sampling_rate > 0.0) {
            return Err(EvalError::FormatError(format!(
                "{}: 采样率无效 / invalid sampling rate {}",
                self.key, self.sampling_rate
            )));
        }
        if let Some(annotation) = &self.annotation
            && !annotation.is_strictly_increasing()
        {
            return Err(EvalError::FormatError(format!(
                "{}: 标注R峰非严格递增 / annotation is not strictly increasing",
                self.key
            )));
        }
        Ok(())
    }
}

/// 录音数据源
///
/// 扫描流程并行调用，实现需可跨线程共享。
pub trait RecordingSource: Sync {
    fn load(&self, key: &RecordingKey) -> EvalResult<Recording>;
}

/// 基于目录的JSON录音库
#[derive(Debug, Clone)]
pub struct JsonRecordingStore {
    root: PathBuf,
}

impl JsonRecordingStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 录音文件路径
    pub fn path_for(&self, key: &RecordingKey) -> PathBuf {
        self.root.join(key.setup.as_str()).join(key.file_name())
    }

    /// 按相同布局写出录音（测试固件与导出使用）
    pub fn save(&self, recording: &Recording) -> EvalResult<PathBuf> {
        let path = self.path_for(&recording.key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(recording)
            .map_err(|e| format_error("录音序列化失败 / failed to serialize recording", e))?;
        fs::write(&path, json)?;
        Ok(path)
    }
}

impl RecordingSource for JsonRecordingStore {
    fn load(&self, key: &RecordingKey) -> EvalResult<Recording> {
        let path = self.path_for(key);
        let content = fs::read_to_string(&path).map_err(|e| {
            EvalError::IoError(std::io::Error::new(
                e.kind(),
                format!("{}: {e}", path.display()),
            ))
        })?;

        let recording: Recording = serde_json::from_str(&content)
            .map_err(|e| format_error(&path.display().to_string(), e))?;

        if recording.key != *key {
            return Err(EvalError::FormatError(format!(
                "{}: 文件内容与路径不符 / file describes {} but was loaded as {key}",
                path.display(),
                recording.key
            )));
        }

        recording.validate()?;
        Ok(recording)
    }
}
