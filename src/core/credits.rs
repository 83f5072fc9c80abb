//! 学分统计
//!
//! 成绩是否及格由成绩等级表决定，部分课程另有按专业设定的最低成绩。
//! 学分缺失或为负的课程不计入统计。

use crate::core::categorizer::CatalogError;
use crate::core::major;
use crate::core::models::{CategorizedCourse, CourseGradeRequirement, CreditTotals, GradeType};
use crate::core::patterns::normalize_code;
use async_trait::async_trait;
use std::collections::HashMap;

/// 内置成绩等级
const STANDARD_SCALE: &[(&str, f64, bool)] = &[
    ("A+", 4.0, true),
    ("A", 4.0, true),
    ("A-", 3.67, true),
    ("B+", 3.33, true),
    ("B", 3.0, true),
    ("B-", 2.67, true),
    ("C+", 2.33, true),
    ("C", 2.0, true),
    ("C-", 1.67, true),
    ("D+", 1.33, true),
    ("D", 1.0, true),
    ("D-", 0.67, true),
    ("P", 0.0, true),
    ("F", 0.0, false),
    ("W", 0.0, false),
    ("I", 0.0, false),
    ("NC", 0.0, false),
];

#[derive(Debug, Clone, Copy, PartialEq)]
struct GradeInfo {
    numeric_value: f64,
    is_passing: bool,
}

fn grade_key(grade: &str) -> String {
    grade.trim().to_uppercase()
}

/// 某个专业的评分规则：成绩等级表 + 课程最低成绩
#[derive(Debug, Clone, PartialEq)]
pub struct GradingPolicy {
    grades: HashMap<String, GradeInfo>,
    minimums: HashMap<String, String>,
}

/// 内置成绩等级表（数据库中没有成绩等级时使用）
pub fn standard_grade_types() -> Vec<GradeType> {
    STANDARD_SCALE
        .iter()
        .map(|(grade, value, passing)| GradeType::new(grade, *value, *passing))
        .collect()
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self::new(&standard_grade_types(), &[], "")
    }
}

impl GradingPolicy {
    /// 由成绩等级和最低成绩要求构建，只保留 major 对应的要求
    pub fn new(grade_types: &[GradeType], requirements: &[CourseGradeRequirement], major: &str) -> Self {
        let grades = grade_types
            .iter()
            .map(|gt| {
                (
                    grade_key(&gt.grade),
                    GradeInfo {
                        numeric_value: gt.numeric_value,
                        is_passing: gt.is_passing,
                    },
                )
            })
            .collect();

        let major_code = major::canonical_major(major);
        let minimums = requirements
            .iter()
            .filter(|r| major::canonical_major(&r.major_code) == major_code)
            .map(|r| (normalize_code(&r.course_code), grade_key(&r.minimum_grade)))
            .collect();

        Self { grades, minimums }
    }

    /// 成绩等级表中标记为及格；表中没有的成绩不算及格
    pub fn is_passing(&self, grade: &str) -> bool {
        self.grades
            .get(&grade_key(grade))
            .map(|info| info.is_passing)
            .unwrap_or(false)
    }

    /// 成绩是否达到最低要求
    ///
    /// 任一成绩不在等级表中时无法比较，退回为普通的及格判断。
    pub fn meets_grade_requirement(&self, actual: &str, minimum: &str) -> bool {
        match (self.grades.get(&grade_key(actual)), self.grades.get(&grade_key(minimum))) {
            (Some(actual), Some(minimum)) => actual.numeric_value >= minimum.numeric_value,
            _ => {
                tracing::warn!(actual, minimum, "成绩等级表中缺少比较所需的成绩");
                self.is_passing(actual)
            }
        }
    }

    pub fn minimum_grade(&self, course_code: &str) -> Option<&str> {
        self.minimums.get(&normalize_code(course_code)).map(String::as_str)
    }

    /// 课程是否算通过：成绩及格且达到该课程的最低成绩
    pub fn course_passes(&self, course_code: &str, grade: &str) -> bool {
        if !self.is_passing(grade) {
            return false;
        }
        match self.minimum_grade(course_code) {
            Some(minimum) => self.meets_grade_requirement(grade, minimum),
            None => true,
        }
    }
}

/// 评分规则来源
#[async_trait]
pub trait GradingLookup: Send + Sync {
    async fn grading_policy(&self, major_code: &str) -> Result<GradingPolicy, CatalogError>;
}

/// 学分与课程数统计
pub fn credit_totals(courses: &[CategorizedCourse], policy: &GradingPolicy) -> CreditTotals {
    courses.iter().fold(CreditTotals::default(), |mut totals, course| {
        let credits = match course.credits {
            Some(c) if c.is_finite() && c >= 0.0 => c,
            _ => return totals,
        };

        totals.credits_taken += credits;
        totals.courses_total += 1;

        let grade = course.grade.as_deref().unwrap_or("");
        if policy.course_passes(&course.code, grade) {
            totals.credits_passed += credits;
            totals.courses_passed += 1;
        }
        totals
    })
}
