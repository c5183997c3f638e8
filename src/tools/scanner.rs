//! 录音库扫描模块
//!
//! 负责发现录音库中某导联方式下存在的受试者编号。

use super::utils;
use crate::error::{EvalError, EvalResult};
use crate::recording::Setup;
use std::collections::BTreeSet;
use std::path::Path;
use walkdir::WalkDir;

/// 录音文件名前缀
const FILE_PREFIX: &str = "subject_";

/// 录音文件扩展名
const FILE_EXTENSION: &str = "json";

/// 扫描 `<root>/<setup>/` 下的录音文件，返回排序去重后的受试者编号
pub fn discover_subjects(root: &Path, setup: Setup) -> EvalResult<Vec<u32>> {
    if !root.exists() {
        return Err(EvalError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("录音库目录不存在: {}", root.display()),
        )));
    }

    if !root.is_dir() {
        return Err(EvalError::InvalidInput(format!(
            "路径不是目录: {}",
            root.display()
        )));
    }

    let setup_dir = root.join(setup.as_str());
    if !setup_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut subjects = BTreeSet::new();

    // 只扫描导联目录本层
    for entry in WalkDir::new(&setup_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            EvalError::IoError(std::io::Error::other(format!(
                "目录遍历失败 / walk failed: {e}"
            )))
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        if let Some(subject) = parse_subject(entry.path()) {
            subjects.insert(subject);
        }
    }

    Ok(subjects.into_iter().collect())
}

/// 从 `subject_NN_<condition>.json` 文件名中解析受试者编号
fn parse_subject(path: &Path) -> Option<u32> {
    let extension = path.extension()?.to_str()?;
    if !extension.eq_ignore_ascii_case(FILE_EXTENSION) {
        return None;
    }

    let rest = utils::extract_file_stem(path).strip_prefix(FILE_PREFIX)?;
    let (number, _condition) = rest.split_once('_')?;
    number.parse().ok()
}

/// 显示扫描结果
pub fn show_discovery_results(root: &Path, setup: Setup, subjects: &[u32], verbose: bool) {
    if subjects.is_empty() {
        println!(
            "[WARNING] 在 {} 中没有找到 {setup} 录音 / No {setup} recordings found",
            root.display()
        );
        return;
    }

    println!(
        "[INFO] {setup}: 找到 {} 位受试者 / {} subjects found",
        subjects.len(),
        subjects.len()
    );

    if verbose {
        let list: Vec<String> = subjects.iter().map(|s| s.to_string()).collect();
        println!("   受试者 / Subjects: {}", list.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_subject() {
        assert_eq!(parse_subject(Path::new("subject_03_maths.json")), Some(3));
        assert_eq!(parse_subject(Path::new("subject_12_hand_bike.json")), Some(12));
        assert_eq!(parse_subject(Path::new("subject_03_maths.csv")), None);
        assert_eq!(parse_subject(Path::new("notes.json")), None);
        assert_eq!(parse_subject(Path::new("subject_xx_maths.json")), None);
    }

    #[test]
    fn test_discover_subjects() {
        let dir = tempfile::tempdir().unwrap();
        let setup_dir = dir.path().join("chest_strap");
        fs::create_dir_all(&setup_dir).unwrap();
        for name in [
            "subject_07_sitting.json",
            "subject_07_jogging.json",
            "subject_01_walking.json",
            "readme.txt",
        ] {
            fs::write(setup_dir.join(name), "{}").unwrap();
        }

        let subjects = discover_subjects(dir.path(), Setup::ChestStrap).unwrap();
        assert_eq!(subjects, vec![1, 7]);

        let none = discover_subjects(dir.path(), Setup::Einthoven).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            discover_subjects(&missing, Setup::Einthoven),
            Err(EvalError::IoError(_))
        ));
    }
}
