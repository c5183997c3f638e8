//! 统一错误处理框架
//!
//! 评估流程中所有可恢复/不可恢复错误的类型定义。
//! 批量扫描只对 `InvalidInput` 快速失败，其余错误按录音粒度记录后继续。

use std::fmt;
use std::io;

/// 评估相关的统一错误类型
#[derive(Debug)]
pub enum EvalError {
    /// 输入/配置验证错误（未知的导联方式、条件、检测方法等，快速失败）
    InvalidInput(String),

    /// 文件I/O错误
    IoError(io::Error),

    /// 录音文件或结果表格式错误
    FormatError(String),

    /// 录音缺少人工标注的R峰（可恢复，跳过该录音）
    MissingAnnotation(String),

    /// 检测器输出过少（可恢复，从汇总中排除）
    DegenerateDetection { detected: usize, minimum: usize },

    /// 计算异常
    CalculationError(String),

    /// 资源访问错误（线程池等）
    ResourceError(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::InvalidInput(msg) => write!(f, "输入验证失败: {msg}"),
            EvalError::IoError(err) => write!(f, "文件I/O错误: {err}"),
            EvalError::FormatError(msg) => write!(f, "数据格式错误: {msg}"),
            EvalError::MissingAnnotation(msg) => write!(f, "缺少标注: {msg}"),
            EvalError::DegenerateDetection { detected, minimum } => write!(
                f,
                "检测结果过少: {detected} 个R峰 (最少需要 {minimum} 个)"
            ),
            EvalError::CalculationError(msg) => write!(f, "计算异常: {msg}"),
            EvalError::ResourceError(msg) => write!(f, "资源访问错误: {msg}"),
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvalError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for EvalError {
    fn from(err: io::Error) -> Self {
        EvalError::IoError(err)
    }
}

impl From<serde_json::Error> for EvalError {
    fn from(err: serde_json::Error) -> Self {
        EvalError::FormatError(format!("JSON解析错误: {err}"))
    }
}

/// 评估操作的标准Result类型
pub type EvalResult<T> = Result<T, EvalError>;

// ==================== 错误转换Helper函数 ====================

/// 创建格式错误的helper函数
#[inline]
pub fn format_error<E: fmt::Display>(context: &str, err: E) -> EvalError {
    EvalError::FormatError(format!("{context}: {err}"))
}

/// 创建计算错误的helper函数
#[inline]
pub fn calculation_error<E: fmt::Display>(context: &str, err: E) -> EvalError {
    EvalError::CalculationError(format!("{context}: {err}"))
}

// ==================== 错误分类系统 ====================
// 用于批量扫描中的跳过/失败统计

/// 错误类别枚举（用于批量处理统计）
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum ErrorCategory {
    /// 数据相关（缺少标注、检测结果过少）
    Data,
    /// 格式相关错误（JSON损坏、事件序列非递增等）
    Format,
    /// I/O相关错误（录音文件不存在、权限不足等）
    Io,
    /// 计算相关错误
    Calculation,
    /// 其他未分类错误
    Other,
}

impl ErrorCategory {
    /// 从EvalError提取错误类别
    pub fn from_eval_error(e: &EvalError) -> Self {
        match e {
            EvalError::MissingAnnotation(_) | EvalError::DegenerateDetection { .. } => Self::Data,
            EvalError::FormatError(_) => Self::Format,
            EvalError::IoError(_) => Self::Io,
            EvalError::CalculationError(_) => Self::Calculation,
            EvalError::InvalidInput(_) | EvalError::ResourceError(_) => Self::Other,
        }
    }

    /// 获取错误类别的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Data => "数据跳过 / Data skip",
            Self::Format => "格式错误 / Format",
            Self::Io => "I/O错误 / I/O",
            Self::Calculation => "计算错误 / Calculation",
            Self::Other => "其他错误 / Other",
        }
    }
}
