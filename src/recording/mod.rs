//! 录音数据模块
//!
//! 录音标识、录音数据库读取和检测器注册表。

pub mod detectors;
pub mod setup;
pub mod store;

// 重新导出公共接口
pub use detectors::{
    DetectionSource, DetectorMethod, DetectorRegistry, PeakDetector, StoredDetections,
};
pub use setup::{Condition, RecordingKey, Setup};
pub use store::{JsonRecordingStore, Recording, RecordingSource};
