//! 工具函数模块
//!
//! 提供并发度计算、文件路径处理、数值格式化等通用工具函数。

use super::constants::parallel_limits;

/// 计算实际并发度：限制在 [MIN, MAX] 内，且不超过任务数
#[inline]
pub fn effective_parallel_degree(requested: usize, task_count: Option<usize>) -> usize {
    let clamped = requested.clamp(
        parallel_limits::MIN_PARALLEL_DEGREE,
        parallel_limits::MAX_PARALLEL_DEGREE,
    );
    match task_count {
        Some(0) | None => clamped,
        Some(count) => clamped.min(count),
    }
}

/// 文件路径处理工具函数
pub mod path {
    use std::path::Path;

    /// 提取文件名（返回String，用于日志显示）
    #[inline]
    pub fn extract_filename_lossy(path: &Path) -> String {
        path.file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// 提取文件stem（不含扩展名）
    #[inline]
    pub fn extract_file_stem(path: &Path) -> &str {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("recording")
    }
}

/// 数值格式化工具函数（表格与CSV输出）
pub mod format {
    /// 可选数值格式化，无定义时输出 "n/a"
    #[inline]
    pub fn optional(value: Option<f64>, precision: usize) -> String {
        match value {
            Some(v) if v.is_finite() => format!("{v:.precision$}"),
            _ => "n/a".to_string(),
        }
    }

    /// CSV字段：无定义时留空
    #[inline]
    pub fn csv_optional(value: Option<f64>) -> String {
        match value {
            Some(v) if v.is_finite() => v.to_string(),
            _ => String::new(),
        }
    }

    /// 比率格式化为百分比字符串
    #[inline]
    pub fn percent(numerator: usize, denominator: usize) -> String {
        if denominator == 0 {
            "n/a".to_string()
        } else {
            format!("{:.1}%", numerator as f64 / denominator as f64 * 100.0)
        }
    }
}

// 重新导出为平级函数
pub use path::{extract_file_stem, extract_filename_lossy};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_effective_parallel_degree() {
        assert_eq!(effective_parallel_degree(4, Some(100)), 4);
        assert_eq!(effective_parallel_degree(4, Some(2)), 2);
        assert_eq!(effective_parallel_degree(0, Some(10)), 1);
        assert_eq!(effective_parallel_degree(64, None), 16);
        assert_eq!(effective_parallel_degree(8, Some(0)), 8);
    }

    #[test]
    fn test_path_helpers() {
        let path = Path::new("/data/einthoven/subject_03_maths.json");
        assert_eq!(extract_filename_lossy(path), "subject_03_maths.json");
        assert_eq!(extract_file_stem(path), "subject_03_maths");
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format::optional(Some(0.12345), 3), "0.123");
        assert_eq!(format::optional(None, 3), "n/a");
        assert_eq!(format::optional(Some(f64::NAN), 2), "n/a");
        assert_eq!(format::csv_optional(Some(0.5)), "0.5");
        assert_eq!(format::csv_optional(None), "");
        assert_eq!(format::percent(1, 4), "25.0%");
        assert_eq!(format::percent(1, 0), "n/a");
    }
}
