//! 毕业设计（Capstone）选项判定
//!
//! 判定顺序：论文 -> 创业 -> 工程毕业设计 -> 应用项目 -> 默认应用项目。
//! 同时满足多个分组时只取最先判定的那个。

use crate::core::major;
use crate::core::models::{CapstoneOption, TranscriptCourse};
use crate::core::patterns::{NormalizedCourse, PatternTables};

/// 毕业设计判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapstoneDetection {
    pub option: CapstoneOption,
    pub thesis_hits: Vec<String>,
    pub entrepreneurship_hits: Vec<String>,
    pub engineering_hits: Vec<String>,
    pub applied_hits: Vec<String>,
    /// 由专业直接决定（工程类专业）
    pub by_major: bool,
}

impl CapstoneDetection {
    /// 没有课程证据，也不是由专业决定的
    pub fn defaulted(&self) -> bool {
        !self.by_major
            && self.thesis_hits.is_empty()
            && self.entrepreneurship_hits.is_empty()
            && self.engineering_hits.is_empty()
            && self.applied_hits.is_empty()
    }
}

/// 扫描全部课程，按优先级选出毕业设计选项
///
/// 四个分组都要检查，耗时 O(N × 模式数)。
pub fn detect_capstone_option(
    courses: &[TranscriptCourse],
    major_code: Option<&str>,
    tables: &PatternTables,
) -> CapstoneDetection {
    let mut thesis_hits = Vec::new();
    let mut entrepreneurship_hits = Vec::new();
    let mut engineering_hits = Vec::new();
    let mut applied_hits = Vec::new();

    for course in courses {
        let normalized = NormalizedCourse::from(course);
        if tables.thesis.matches(&normalized) {
            thesis_hits.push(normalized.code.clone());
        }
        if tables.entrepreneurship.matches(&normalized) {
            entrepreneurship_hits.push(normalized.code.clone());
        }
        if tables.engineering_senior_project.matches(&normalized) {
            engineering_hits.push(normalized.code.clone());
        }
        if tables.applied_project.matches(&normalized) {
            applied_hits.push(normalized.code);
        }
    }

    let by_major = major_code.map(major::is_engineering).unwrap_or(false);

    let option = if by_major {
        CapstoneOption::EngineeringSeniorProject
    } else if !thesis_hits.is_empty() {
        CapstoneOption::UndergraduateThesis
    } else if !entrepreneurship_hits.is_empty() {
        CapstoneOption::Entrepreneurship
    } else if !engineering_hits.is_empty() {
        CapstoneOption::EngineeringSeniorProject
    } else {
        // 命中 applied_project 或什么都没命中，结果相同
        CapstoneOption::AppliedProject
    };

    tracing::debug!(
        course_count = courses.len(),
        ?thesis_hits,
        ?entrepreneurship_hits,
        ?engineering_hits,
        ?applied_hits,
        by_major,
        %option,
        "毕业设计课程检测"
    );

    CapstoneDetection {
        option,
        thesis_hits,
        entrepreneurship_hits,
        engineering_hits,
        applied_hits,
        by_major,
    }
}

/// 仅根据课程判定毕业设计选项
pub fn determine_capstone_option(
    courses: &[TranscriptCourse],
    tables: &PatternTables,
) -> CapstoneOption {
    detect_capstone_option(courses, None, tables).option
}

/// 结合专业判定：工程类专业固定为工程毕业设计
pub fn determine_capstone_option_for_major(
    courses: &[TranscriptCourse],
    major_code: &str,
    tables: &PatternTables,
) -> CapstoneOption {
    detect_capstone_option(courses, Some(major_code), tables).option
}
