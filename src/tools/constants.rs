//! 常量和默认配置集中管理
//!
//! 将所有重要常量集中定义，避免"默认值漂移"和重复定义

/// R峰匹配与评分常量
pub mod scoring {
    /// 默认容差窗口（秒）
    ///
    /// 0.1秒对应 250Hz 下的 25 个采样点（W = int(fs / 10)）
    pub const TOLERANCE_WINDOW_SECONDS: f64 = 0.1;

    /// 检测器最少检测数
    ///
    /// 少于该数量的检测结果视为"该方法在此录音上失败"，不参与汇总
    pub const MIN_DETECTIONS: usize = 10;

    /// JF评分默认最大延迟（秒）
    pub const JF_DEFAULT_MAX_LAG_SECONDS: f64 = 0.1;

    /// JF评分抖动归一化常数（秒）
    ///
    /// 抖动等于该值时 J = 0.5
    pub const JF_NORM_JITTER_SECONDS: f64 = 0.012;
}

/// 默认配置值
pub mod defaults {
    /// 数据库默认采样率（Hz）
    pub const SAMPLING_RATE_HZ: f64 = 250.0;

    /// 数据库受试者数量（编号 0..25）
    pub const SUBJECT_COUNT: u32 = 25;

    /// 默认并行度
    ///
    /// 每个 (受试者, 条件) 组合是独立任务，4并发度在多数场景下足够
    pub const PARALLEL_DEGREE: usize = 4;

    /// 默认输出目录名
    pub const OUTPUT_DIR: &str = "results";
}

/// 并发度限制常量
pub mod parallel_limits {
    /// 最小并发度
    pub const MIN_PARALLEL_DEGREE: usize = 1;

    /// 最大并发度
    pub const MAX_PARALLEL_DEGREE: usize = 16;
}
