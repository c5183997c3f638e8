//! R峰检测器注册表
//!
//! 检测算法本身是外部黑盒：每个检测器把原始信号映射为R峰采样点序列。
//! 扫描流程通过 [`DetectionSource`] 获取检测结果，有两种来源：
//!
//! - [`DetectorRegistry`]：在原始信号上实时运行已注册的检测器
//! - [`StoredDetections`]：回放录音文件中已存储的检测结果

use super::store::Recording;
use crate::core::EventSequence;
use crate::error::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 检测方法标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorMethod {
    Elgendi,
    MatchedFilter,
    WaveletTransform,
    Christov,
    Hamilton,
    PanTompkins,
    Engzee,
    Wqrs,
}

impl DetectorMethod {
    pub const ALL: [DetectorMethod; 8] = [
        DetectorMethod::Elgendi,
        DetectorMethod::MatchedFilter,
        DetectorMethod::WaveletTransform,
        DetectorMethod::Christov,
        DetectorMethod::Hamilton,
        DetectorMethod::PanTompkins,
        DetectorMethod::Engzee,
        DetectorMethod::Wqrs,
    ];

    /// 存储与导出使用的方法名
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elgendi => "elgendi",
            Self::MatchedFilter => "matched_filter",
            Self::WaveletTransform => "wavelet_transform",
            Self::Christov => "christov",
            Self::Hamilton => "hamilton",
            Self::PanTompkins => "pan_tompkins",
            Self::Engzee => "engzee",
            Self::Wqrs => "wqrs",
        }
    }

    /// 报告中的显示名
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Elgendi => "Elgendi et al.",
            Self::MatchedFilter => "Matched filter",
            Self::WaveletTransform => "Wavelet transform",
            Self::Christov => "Christov",
            Self::Hamilton => "Hamilton",
            Self::PanTompkins => "Pan-Tompkins",
            Self::Engzee => "Engzee",
            Self::Wqrs => "WQRS",
        }
    }
}

impl FromStr for DetectorMethod {
    type Err = EvalError;

    fn from_str(s: &str) -> EvalResult<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' ', '.'], "_");
        match normalized.trim_end_matches('_') {
            "elgendi" | "elgendi_et_al" => Ok(Self::Elgendi),
            "matched_filter" => Ok(Self::MatchedFilter),
            "wavelet_transform" | "wavelet" | "swt" => Ok(Self::WaveletTransform),
            "christov" => Ok(Self::Christov),
            "hamilton" => Ok(Self::Hamilton),
            "pan_tompkins" => Ok(Self::PanTompkins),
            "engzee" => Ok(Self::Engzee),
            "wqrs" => Ok(Self::Wqrs),
            _ => Err(EvalError::InvalidInput(format!(
                "未知检测方法 / unknown detector method '{s}'"
            ))),
        }
    }
}

impl fmt::Display for DetectorMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// R峰检测能力
///
/// 实现方在构造时绑定采样率，`detect` 只接收原始信号。
pub trait PeakDetector: Send + Sync {
    fn detect(&self, signal: &[f64]) -> Vec<u64>;
}

impl<F> PeakDetector for F
where
    F: Fn(&[f64]) -> Vec<u64> + Send + Sync,
{
    fn detect(&self, signal: &[f64]) -> Vec<u64> {
        self(signal)
    }
}

/// 扫描流程使用的检测结果来源
pub trait DetectionSource: Sync {
    /// 可用的检测方法（有序）
    fn methods(&self) -> Vec<DetectorMethod>;

    /// 获取某方法在某录音上的检测结果
    fn detect(&self, method: DetectorMethod, recording: &Recording) -> EvalResult<EventSequence>;
}

/// 检测方法 -> 检测器 的类型化映射
#[derive(Default)]
pub struct DetectorRegistry {
    detectors: BTreeMap<DetectorMethod, Box<dyn PeakDetector>>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册检测器，同名方法覆盖旧实现
    pub fn register(&mut self, method: DetectorMethod, detector: impl PeakDetector + 'static) {
        self.detectors.insert(method, Box::new(detector));
    }

    pub fn with(mut self, method: DetectorMethod, detector: impl PeakDetector + 'static) -> Self {
        self.register(method, detector);
        self
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn get(&self, method: DetectorMethod) -> Option<&dyn PeakDetector> {
        self.detectors.get(&method).map(|d| d.as_ref())
    }
}

impl fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorRegistry")
            .field("methods", &self.detectors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DetectionSource for DetectorRegistry {
    fn methods(&self) -> Vec<DetectorMethod> {
        self.detectors.keys().copied().collect()
    }

    fn detect(&self, method: DetectorMethod, recording: &Recording) -> EvalResult<EventSequence> {
        let detector = self.get(method).ok_or_else(|| {
            EvalError::InvalidInput(format!("检测器未注册 / detector not registered: {method}"))
        })?;

        let mut events = detector.detect(&recording.signal);
        // 检测器输出顺序不作保证，统一排序；重复检测保留，计入成对匹配
        events.sort_unstable();
        Ok(EventSequence::from_vec(events))
    }
}

/// 回放录音文件中已存储的检测结果
#[derive(Debug, Clone)]
pub struct StoredDetections {
    methods: Vec<DetectorMethod>,
}

impl StoredDetections {
    pub fn new(methods: Vec<DetectorMethod>) -> Self {
        Self { methods }
    }

    pub fn all() -> Self {
        Self::new(DetectorMethod::ALL.to_vec())
    }
}

impl DetectionSource for StoredDetections {
    fn methods(&self) -> Vec<DetectorMethod> {
        self.methods.clone()
    }

    fn detect(&self, method: DetectorMethod, recording: &Recording) -> EvalResult<EventSequence> {
        let events = recording.detections.get(method.as_str()).ok_or_else(|| {
            EvalError::FormatError(format!(
                "{}: 缺少 {method} 的检测结果 / no stored detections for {method}",
                recording.key
            ))
        })?;

        if !events.is_strictly_increasing() {
            return Err(EvalError::FormatError(format!(
                "{}: {method} 检测结果非严格递增 / detections are not strictly increasing",
                recording.key
            )));
        }

        Ok(events.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::setup::{Condition, RecordingKey, Setup};

    fn recording() -> Recording {
        let mut detections = BTreeMap::new();
        detections.insert(
            "hamilton".to_string(),
            EventSequence::from_vec(vec![10, 20, 30]),
        );
        Recording {
            key: RecordingKey::new(Setup::Einthoven, 0, Condition::Sitting),
            sampling_rate: 250.0,
            signal: vec![0.0, 1.0, 0.0, 0.5, 2.0, 0.0],
            annotation: None,
            detections,
        }
    }

    /// 简单局部最大值检测，仅用于测试注册表行为
    fn local_maxima(signal: &[f64]) -> Vec<u64> {
        signal
            .windows(3)
            .enumerate()
            .filter(|(_, w)| w[1] > w[0] && w[1] > w[2])
            .map(|(i, _)| i as u64 + 1)
            .collect()
    }

    #[test]
    fn test_method_parse_roundtrip() {
        for method in DetectorMethod::ALL {
            assert_eq!(method.as_str().parse::<DetectorMethod>().unwrap(), method);
        }
        assert_eq!(
            "Elgendi_et_al".parse::<DetectorMethod>().unwrap(),
            DetectorMethod::Elgendi
        );
        assert_eq!(
            "Pan-Tompkins".parse::<DetectorMethod>().unwrap(),
            DetectorMethod::PanTompkins
        );
        assert!("magic".parse::<DetectorMethod>().is_err());
    }

    #[test]
    fn test_registry_runs_detector_on_signal() {
        let registry = DetectorRegistry::new().with(DetectorMethod::Christov, local_maxima);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.methods(), vec![DetectorMethod::Christov]);

        let events = registry
            .detect(DetectorMethod::Christov, &recording())
            .unwrap();
        assert_eq!(events.as_slice(), &[1, 4]);
    }

    #[test]
    fn test_registry_sorts_detector_output() {
        let registry = DetectorRegistry::new()
            .with(DetectorMethod::Wqrs, |_: &[f64]| vec![30u64, 10, 20, 10]);
        let events = registry.detect(DetectorMethod::Wqrs, &recording()).unwrap();
        assert_eq!(events.as_slice(), &[10, 10, 20, 30]);
    }

    #[test]
    fn test_unregistered_method_is_invalid_input() {
        let registry = DetectorRegistry::new();
        assert!(matches!(
            registry.detect(DetectorMethod::Engzee, &recording()),
            Err(EvalError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_stored_detections_replay() {
        let stored = StoredDetections::new(vec![DetectorMethod::Hamilton, DetectorMethod::Engzee]);
        let events = stored
            .detect(DetectorMethod::Hamilton, &recording())
            .unwrap();
        assert_eq!(events.as_slice(), &[10, 20, 30]);

        assert!(matches!(
            stored.detect(DetectorMethod::Engzee, &recording()),
            Err(EvalError::FormatError(_))
        ));
    }

    #[test]
    fn test_stored_detections_reject_repeated_index() {
        let mut rec = recording();
        rec.detections.insert(
            "engzee".to_string(),
            EventSequence::from_vec(vec![10, 10, 30]),
        );
        let stored = StoredDetections::all();

        assert!(matches!(
            stored.detect(DetectorMethod::Engzee, &rec),
            Err(EvalError::FormatError(_))
        ));
        assert!(stored.detect(DetectorMethod::Hamilton, &rec).is_ok());
    }
}
