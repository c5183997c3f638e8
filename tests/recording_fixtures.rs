//! 录音库测试固件
//!
//! 在临时目录中按 `<root>/<setup>/subject_NN_<condition>.json` 布局写出录音，
//! 供各集成测试共享。

#![allow(dead_code)]

use rpeak_eval_tool::core::EventSequence;
use rpeak_eval_tool::recording::{
    Condition, DetectorMethod, JsonRecordingStore, Recording, RecordingKey, Setup,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 默认采样率（Hz）
pub const FS: f64 = 250.0;

/// 规则心跳序列：从 `start` 起每 `spacing` 个采样点一个R峰
pub fn beats(count: u64, start: u64, spacing: u64) -> Vec<u64> {
    (0..count).map(|i| start + i * spacing).collect()
}

/// 临时录音库
pub struct RecordingFixtures {
    dir: TempDir,
    store: JsonRecordingStore,
}

impl RecordingFixtures {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("创建临时目录失败 / failed to create temp dir");
        let store = JsonRecordingStore::new(dir.path());
        Self { dir, store }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn store(&self) -> &JsonRecordingStore {
        &self.store
    }

    /// 写出一条录音
    pub fn write(
        &self,
        key: RecordingKey,
        annotation: Option<Vec<u64>>,
        detections: &[(DetectorMethod, Vec<u64>)],
    ) -> PathBuf {
        let detections: BTreeMap<String, EventSequence> = detections
            .iter()
            .map(|(method, events)| {
                (
                    method.as_str().to_string(),
                    EventSequence::from_vec(events.clone()),
                )
            })
            .collect();

        let recording = Recording {
            key,
            sampling_rate: FS,
            signal: vec![0.0; 2500],
            annotation: annotation.map(EventSequence::from_vec),
            detections,
        };

        self.store
            .save(&recording)
            .expect("写出录音失败 / failed to write recording")
    }

    /// 直接写出文件内容（用于损坏文件测试）
    pub fn write_raw(&self, key: RecordingKey, contents: &str) -> PathBuf {
        let path = self.store.path_for(&key);
        std::fs::create_dir_all(path.parent().expect("录音路径必有父目录"))
            .expect("创建目录失败 / failed to create dir");
        std::fs::write(&path, contents).expect("写文件失败 / failed to write file");
        path
    }

    /// 标准受试者：标注30个R峰，hamilton 完全一致，engzee 只有9个检测
    pub fn write_standard(&self, setup: Setup, subject: u32, condition: Condition) -> PathBuf {
        let annotation = beats(30, 100, 200);
        self.write(
            RecordingKey::new(setup, subject, condition),
            Some(annotation.clone()),
            &[
                (DetectorMethod::Hamilton, annotation),
                (DetectorMethod::Engzee, beats(9, 100, 200)),
                (DetectorMethod::PanTompkins, beats(30, 103, 200)),
            ],
        )
    }
}

#[test]
fn test_fixture_layout() {
    let fixtures = RecordingFixtures::new();
    let path = fixtures.write_standard(Setup::ChestStrap, 3, Condition::HandBike);
    assert!(path.ends_with("chest_strap/subject_03_hand_bike.json"));
    assert!(path.starts_with(fixtures.root()));
}
