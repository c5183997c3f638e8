//! 录音标识：导联方式、实验条件、受试者
//!
//! 所有字符串标识在解析时快速失败，未知值属于配置错误而不是数据问题。

use crate::error::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 电极导联方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Setup {
    /// 线缆导联（Einthoven II）
    Einthoven,
    /// 胸带导联（V2-V1）
    ChestStrap,
}

impl Setup {
    pub const ALL: [Setup; 2] = [Setup::Einthoven, Setup::ChestStrap];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Einthoven => "einthoven",
            Self::ChestStrap => "chest_strap",
        }
    }
}

impl FromStr for Setup {
    type Err = EvalError;

    fn from_str(s: &str) -> EvalResult<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "einthoven" => Ok(Self::Einthoven),
            "chest_strap" => Ok(Self::ChestStrap),
            _ => Err(EvalError::InvalidInput(format!(
                "未知导联方式 / unknown setup '{s}' (expected: einthoven, chest_strap)"
            ))),
        }
    }
}

impl fmt::Display for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 实验条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Sitting,
    Maths,
    Walking,
    HandBike,
    Jogging,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::Sitting,
        Condition::Maths,
        Condition::Walking,
        Condition::HandBike,
        Condition::Jogging,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sitting => "sitting",
            Self::Maths => "maths",
            Self::Walking => "walking",
            Self::HandBike => "hand_bike",
            Self::Jogging => "jogging",
        }
    }
}

impl FromStr for Condition {
    type Err = EvalError;

    fn from_str(s: &str) -> EvalResult<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "sitting" => Ok(Self::Sitting),
            "maths" | "math" => Ok(Self::Maths),
            "walking" => Ok(Self::Walking),
            "hand_bike" | "handbike" => Ok(Self::HandBike),
            "jogging" => Ok(Self::Jogging),
            _ => Err(EvalError::InvalidInput(format!(
                "未知实验条件 / unknown condition '{s}' (expected: sitting, maths, walking, hand_bike, jogging)"
            ))),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单条录音的唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordingKey {
    pub setup: Setup,
    pub subject: u32,
    pub condition: Condition,
}

impl RecordingKey {
    pub fn new(setup: Setup, subject: u32, condition: Condition) -> Self {
        Self {
            setup,
            subject,
            condition,
        }
    }

    /// 录音文件名（不含目录）
    pub fn file_name(&self) -> String {
        format!("subject_{:02}_{}.json", self.subject, self.condition)
    }
}

impl fmt::Display for RecordingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / subject {} / {}",
            self.setup, self.subject, self.condition
        )
    }
}
