//! 课程匹配表模块
//!
//! 每个轨道维护两组子串：课程代码子串和课程名称子串。
//! 匹配表是纯配置数据，扩展规则只改表，不改分类逻辑。

use crate::core::models::TranscriptCourse;
use serde::{Deserialize, Serialize};

/// 规范化课程代码：大写并去掉所有空白
/// "math 141" 和 "MATH141" 得到同一结果
pub fn normalize_code(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// 规范化课程名称：去掉首尾空白并大写
pub fn normalize_title(title: &str) -> String {
    title.trim().to_uppercase()
}

/// 规范化后的课程，用于一次分类中的重复匹配
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCourse {
    pub code: String,
    pub title: String,
}

impl From<&TranscriptCourse> for NormalizedCourse {
    fn from(course: &TranscriptCourse) -> Self {
        Self {
            code: normalize_code(&course.code),
            title: normalize_title(&course.title),
        }
    }
}

/// 一组匹配子串（代码 + 名称）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSet {
    /// 课程代码子串（任一包含即可）
    #[serde(default)]
    pub codes: Vec<String>,
    /// 课程名称子串（任一包含即可）
    #[serde(default)]
    pub titles: Vec<String>,
}

impl PatternSet {
    pub fn new(codes: &[&str], titles: &[&str]) -> Self {
        Self {
            codes: codes.iter().map(|s| s.to_string()).collect(),
            titles: titles.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// 课程代码是否包含任一代码子串
    /// 空子串会匹配一切，因此忽略
    pub fn matches_code(&self, normalized_code: &str) -> bool {
        self.codes.iter().any(|p| {
            let p = normalize_code(p);
            !p.is_empty() && normalized_code.contains(&p)
        })
    }

    /// 课程名称是否包含任一名称子串
    pub fn matches_title(&self, normalized_title: &str) -> bool {
        self.titles.iter().any(|p| {
            let p = normalize_title(p);
            !p.is_empty() && normalized_title.contains(&p)
        })
    }

    /// 代码或名称任一命中
    pub fn matches(&self, course: &NormalizedCourse) -> bool {
        self.matches_code(&course.code) || self.matches_title(&course.title)
    }

    /// 规范化后的代码子串（用于比较两组是否重叠）
    pub fn normalized_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self
            .codes
            .iter()
            .map(|c| normalize_code(c))
            .filter(|c| !c.is_empty())
            .collect();
        codes.sort();
        codes.dedup();
        codes
    }
}

/// 所有轨道的匹配表
/// 缺失的分组在反序列化时回落到内置值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternTables {
    pub calculus: PatternSet,
    pub pre_calculus: PatternSet,
    pub thesis: PatternSet,
    pub entrepreneurship: PatternSet,
    pub engineering_senior_project: PatternSet,
    pub applied_project: PatternSet,
}

impl Default for PatternTables {
    fn default() -> Self {
        Self {
            calculus: PatternSet::new(
                &["MATH141", "MATH142"],
                &["CALCULUS I", "CALCULUS II", "CALCULUS 1", "CALCULUS 2"],
            ),
            pre_calculus: PatternSet::new(
                &["MATH121", "MATH122"],
                &[
                    "PRE-CALCULUS I",
                    "PRE-CALCULUS II",
                    "PRE-CALCULUS 1",
                    "PRE-CALCULUS 2",
                    "PRECALCULUS",
                ],
            ),
            // BA论文 + CS论文
            thesis: PatternSet::new(&["BUSA400A", "BUSA400B", "CS491", "CS492"], &[]),
            entrepreneurship: PatternSet::new(&["BUSA401A", "BUSA401B"], &[]),
            // 与 applied_project 相同，现有规则无法区分这两个选项
            engineering_senior_project: PatternSet::new(&["BUSA410"], &[]),
            applied_project: PatternSet::new(&["BUSA410"], &[]),
        }
    }
}

impl PatternTables {
    /// 毕业设计各分组，按判定优先级排列
    pub fn capstone_groups(&self) -> [(&'static str, &PatternSet); 4] {
        [
            ("thesis", &self.thesis),
            ("entrepreneurship", &self.entrepreneurship),
            ("engineering_senior_project", &self.engineering_senior_project),
            ("applied_project", &self.applied_project),
        ]
    }

    /// 找出代码子串完全相同的毕业设计分组
    /// 这样的两组永远无法被区分，排在后面的那组实际上不会生效
    pub fn indistinguishable_capstone_groups(&self) -> Vec<(&'static str, &'static str)> {
        let groups = self.capstone_groups();
        let mut pairs = Vec::new();
        for (i, (name_a, set_a)) in groups.iter().enumerate() {
            let codes_a = set_a.normalized_codes();
            if codes_a.is_empty() {
                continue;
            }
            for (name_b, set_b) in groups.iter().skip(i + 1) {
                if set_a.titles.is_empty()
                    && set_b.titles.is_empty()
                    && codes_a == set_b.normalized_codes()
                {
                    pairs.push((*name_a, *name_b));
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_matching_ignores_whitespace_and_case() {
        let set = PatternSet::new(&["MATH 141"], &[]);
        assert!(set.matches_code(&normalize_code("math141")));
        assert!(set.matches_code(&normalize_code("MATH 141")));
        // 子串包含：带后缀的代码也能命中
        assert!(set.matches_code(&normalize_code("MATH141-A")));
        assert!(!set.matches_code(&normalize_code("MATH 121")));
    }

    #[test]
    fn test_title_matching_is_containment() {
        let set = PatternSet::new(&[], &["calculus i"]);
        assert!(set.matches_title(&normalize_title("  Calculus II ")));
        assert!(!set.matches_title(&normalize_title("Statistics")));
    }

    #[test]
    fn test_empty_pattern_matches_nothing() {
        let set = PatternSet::new(&["  "], &[""]);
        let course = NormalizedCourse::from(&TranscriptCourse::new("CS101", "Intro"));
        assert!(!set.matches(&course));
    }

    #[test]
    fn test_default_tables_flag_applied_and_engineering_overlap() {
        let tables = PatternTables::default();
        assert_eq!(
            tables.indistinguishable_capstone_groups(),
            vec![("engineering_senior_project", "applied_project")]
        );
    }

    #[test]
    fn test_partial_tables_fall_back_to_defaults() {
        let json = r#"{"calculus": {"codes": ["MATH151"]}}"#;
        let tables: PatternTables = serde_json::from_str(json).unwrap();
        assert_eq!(tables.calculus.codes, vec!["MATH151".to_string()]);
        assert!(tables.calculus.titles.is_empty());
        assert_eq!(tables.pre_calculus, PatternTables::default().pre_calculus);
    }
}
