//! 评分结果表
//!
//! 固定结构的逐录音结果记录，追加写入，仅在导出边界转换为表格/列式格式。

use crate::core::{SummaryStats, lin_ccc};
use crate::recording::{Condition, DetectorMethod, Setup};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 单个 (录音, 检测方法) 的评分记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub setup: Setup,
    pub subject: u32,
    pub condition: Condition,
    pub method: DetectorMethod,

    pub detected_count: usize,
    pub annotated_count: usize,

    /// 灵敏度，参考序列为空时无定义
    pub sensitivity: Option<f64>,
    /// 阳性预测值，候选序列为空时无定义
    pub positive_predictivity: Option<f64>,

    pub true_positives: i64,
    pub false_positives: i64,
    pub false_negatives: i64,

    /// JF综合评分（百分制）
    pub jf_percent: f64,

    /// 检测序列平均RR间期（秒）
    pub mean_rr_detected: Option<f64>,
    /// 标注序列平均RR间期（秒）
    pub mean_rr_annotated: Option<f64>,
}

impl ScoreRecord {
    fn sort_key(&self) -> (Setup, u32, Condition, DetectorMethod) {
        (self.setup, self.subject, self.condition, self.method)
    }
}

/// 每个检测方法在每次运行上的检测数（所有运行都记录，包括被排除的）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionCount {
    pub setup: Setup,
    pub subject: u32,
    pub condition: Condition,
    pub method: DetectorMethod,
    pub detected: usize,
    pub annotated: usize,
}

impl DetectionCount {
    /// 检测数占标注数的百分比，标注为空时无定义
    pub fn percentage(&self) -> Option<f64> {
        if self.annotated == 0 {
            None
        } else {
            Some(self.detected as f64 * 100.0 / self.annotated as f64)
        }
    }
}

/// 每条已加载录音的信号时长与标注可用性
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingDuration {
    pub setup: Setup,
    pub subject: u32,
    pub condition: Condition,
    pub duration_seconds: f64,
    pub annotated: bool,
}

/// (导联, 方法, 条件) 分组的汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSummary {
    pub setup: Setup,
    pub method: DetectorMethod,
    pub condition: Condition,
    pub sensitivity: SummaryStats,
    pub positive_predictivity: SummaryStats,
    pub jf_percent: SummaryStats,
}

/// (导联, 方法, 条件) 分组的平均RR间期一致性
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcordanceRow {
    pub setup: Setup,
    pub method: DetectorMethod,
    pub condition: Condition,
    /// 参与计算的受试者数
    pub pairs: usize,
    pub ccc: Option<f64>,
}

type GroupKey = (Setup, DetectorMethod, Condition);

/// 追加写入的评分表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreTable {
    records: Vec<ScoreRecord>,
}

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, record: ScoreRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = ScoreRecord>) {
        self.records.extend(records);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    /// 按 (导联, 受试者, 条件, 方法) 稳定排序，保证串行/并行输出一致
    pub fn sort_stable(&mut self) {
        self.records.sort_by_key(|r| r.sort_key());
    }

    pub fn for_setup(&self, setup: Setup) -> ScoreTable {
        self.filtered(|r| r.setup == setup)
    }

    /// 去掉某检测方法（例如胸带数据中的 Engzee）
    pub fn without_method(&self, method: DetectorMethod) -> ScoreTable {
        self.filtered(|r| r.method != method)
    }

    /// 去掉某实验条件（例如线缆导联中的 jogging）
    pub fn without_condition(&self, condition: Condition) -> ScoreTable {
        self.filtered(|r| r.condition != condition)
    }

    fn filtered(&self, keep: impl Fn(&ScoreRecord) -> bool) -> ScoreTable {
        ScoreTable {
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    fn grouped(&self) -> BTreeMap<GroupKey, Vec<&ScoreRecord>> {
        let mut groups: BTreeMap<GroupKey, Vec<&ScoreRecord>> = BTreeMap::new();
        for record in &self.records {
            groups
                .entry((record.setup, record.method, record.condition))
                .or_default()
                .push(record);
        }
        groups
    }

    /// 分组汇总（均值、标准差等），无定义的比率不参与统计
    pub fn summarize(&self) -> Vec<MethodSummary> {
        self.grouped()
            .into_iter()
            .map(|((setup, method, condition), records)| {
                let sensitivity: Vec<f64> = records
                    .iter()
                    .map(|r| r.sensitivity.unwrap_or(f64::NAN))
                    .collect();
                let positive_predictivity: Vec<f64> = records
                    .iter()
                    .map(|r| r.positive_predictivity.unwrap_or(f64::NAN))
                    .collect();
                let jf: Vec<f64> = records.iter().map(|r| r.jf_percent).collect();

                MethodSummary {
                    setup,
                    method,
                    condition,
                    sensitivity: SummaryStats::from_values(&sensitivity),
                    positive_predictivity: SummaryStats::from_values(&positive_predictivity),
                    jf_percent: SummaryStats::from_values(&jf),
                }
            })
            .collect()
    }

    /// 检测序列与标注序列平均RR间期的 Lin CCC（跨受试者）
    pub fn concordance(&self) -> Vec<ConcordanceRow> {
        self.grouped()
            .into_iter()
            .map(|((setup, method, condition), records)| {
                let (detected, annotated): (Vec<f64>, Vec<f64>) = records
                    .iter()
                    .filter_map(|r| Some((r.mean_rr_detected?, r.mean_rr_annotated?)))
                    .unzip();

                ConcordanceRow {
                    setup,
                    method,
                    condition,
                    pairs: detected.len(),
                    ccc: lin_ccc(&detected, &annotated),
                }
            })
            .collect()
    }
}

impl IntoIterator for ScoreTable {
    type Item = ScoreRecord;
    type IntoIter = std::vec::IntoIter<ScoreRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        setup: Setup,
        subject: u32,
        condition: Condition,
        method: DetectorMethod,
        jf: f64,
    ) -> ScoreRecord {
        ScoreRecord {
            setup,
            subject,
            condition,
            method,
            detected_count: 20,
            annotated_count: 20,
            sensitivity: Some(jf / 100.0),
            positive_predictivity: Some(1.0),
            true_positives: 20,
            false_positives: 0,
            false_negatives: 0,
            jf_percent: jf,
            mean_rr_detected: Some(0.8 + subject as f64 * 0.1),
            mean_rr_annotated: Some(0.8 + subject as f64 * 0.1),
        }
    }

    #[test]
    fn test_sort_stable_orders_by_key() {
        let mut table = ScoreTable::new();
        table.push(record(
            Setup::ChestStrap,
            0,
            Condition::Sitting,
            DetectorMethod::Elgendi,
            90.0,
        ));
        table.push(record(
            Setup::Einthoven,
            2,
            Condition::Sitting,
            DetectorMethod::Hamilton,
            80.0,
        ));
        table.push(record(
            Setup::Einthoven,
            1,
            Condition::Walking,
            DetectorMethod::Elgendi,
            70.0,
        ));
        table.sort_stable();

        let order: Vec<(Setup, u32)> = table.records().iter().map(|r| (r.setup, r.subject)).collect();
        assert_eq!(
            order,
            vec![
                (Setup::Einthoven, 1),
                (Setup::Einthoven, 2),
                (Setup::ChestStrap, 0)
            ]
        );
    }

    #[test]
    fn test_summarize_groups_and_skips_undefined() {
        let mut table = ScoreTable::new();
        for (subject, jf) in [(0, 80.0), (1, 100.0)] {
            table.push(record(
                Setup::Einthoven,
                subject,
                Condition::Sitting,
                DetectorMethod::PanTompkins,
                jf,
            ));
        }
        let mut undefined = record(
            Setup::Einthoven,
            2,
            Condition::Sitting,
            DetectorMethod::PanTompkins,
            0.0,
        );
        undefined.sensitivity = None;
        table.push(undefined);

        let summary = table.summarize();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].jf_percent.count, 3);
        assert_eq!(summary[0].sensitivity.count, 2);
        assert!((summary[0].sensitivity.mean - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_filters() {
        let mut table = ScoreTable::new();
        table.push(record(
            Setup::ChestStrap,
            0,
            Condition::Jogging,
            DetectorMethod::Engzee,
            10.0,
        ));
        table.push(record(
            Setup::ChestStrap,
            0,
            Condition::Sitting,
            DetectorMethod::Christov,
            95.0,
        ));

        assert_eq!(table.without_method(DetectorMethod::Engzee).len(), 1);
        assert_eq!(table.without_condition(Condition::Jogging).len(), 1);
        assert_eq!(table.for_setup(Setup::Einthoven).len(), 0);
    }

    #[test]
    fn test_concordance_perfect_mean_rr() {
        let mut table = ScoreTable::new();
        for subject in 0..4 {
            table.push(record(
                Setup::Einthoven,
                subject,
                Condition::Maths,
                DetectorMethod::Christov,
                99.0,
            ));
        }
        let rows = table.concordance();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pairs, 4);
        assert!((rows[0].ccc.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_detection_percentage() {
        let count = DetectionCount {
            setup: Setup::Einthoven,
            subject: 0,
            condition: Condition::Sitting,
            method: DetectorMethod::Engzee,
            detected: 5,
            annotated: 20,
        };
        assert_eq!(count.percentage(), Some(25.0));
        assert_eq!(
            DetectionCount {
                annotated: 0,
                ..count
            }
            .percentage(),
            None
        );
    }
}
