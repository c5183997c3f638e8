//! 核心算法模块
//!
//! R峰事件序列、匹配评分、JF综合评分和汇总统计。全部为纯函数，无跨调用状态。

pub mod events;
pub mod jf_score;
pub mod peak_matcher;
pub mod statistics;

// 重新导出公共接口
pub use events::{EventSequence, ToleranceWindow, rr_intervals};
pub use jf_score::{JfScore, combined_score};
pub use peak_matcher::{MatchResult, PeakMatcher, match_events};
pub use statistics::{SummaryStats, lin_ccc};
