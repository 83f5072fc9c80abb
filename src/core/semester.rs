//! 学期映射模块
//!
//! 把CAMU学期名称（如 "Semester 1 2021-2022"）映射到培养方案的学年/学期。
//! 成绩单上的第一个学期视为第1学年第1学期，暑期学期不推进学期序号。

use crate::core::models::{SemesterMapping, TranscriptSemester};
use chrono::Datelike;
use regex::Regex;
use std::sync::LazyLock;

static ACADEMIC_YEAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}[-/]\d{4}").expect("Invalid academic year regex"));

static YEAR_DIGITS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}").expect("Invalid year digits regex"));

static SEMESTER_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)semester\s+(\d+)").expect("Invalid semester number regex"));

/// 提取学年（"yyyy-yyyy"）
///
/// 依次尝试 "2021-2022"/"2021/2022"、任意两个四位数字，最后回落到当前学年。
pub fn extract_academic_year(semester_name: &str) -> String {
    if let Some(m) = ACADEMIC_YEAR_REGEX.find(semester_name) {
        return m.as_str().replace('/', "-");
    }

    let groups: Vec<&str> = YEAR_DIGITS_REGEX
        .find_iter(semester_name)
        .map(|m| m.as_str())
        .collect();
    if groups.len() >= 2 {
        return format!("{}-{}", groups[0], groups[1]);
    }

    let current_year = chrono::Local::now().year();
    format!("{}-{}", current_year - 1, current_year)
}

/// 提取学期序号（"semester" 后的数字，不区分大小写），找不到时为1
pub fn extract_semester_number(semester_name: &str) -> u32 {
    SEMESTER_NUMBER_REGEX
        .captures(semester_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(1)
}

/// 是否为暑期学期
/// 第3学期通常是暑期，但 2023-2024 学年的第3学期是正常学期
pub fn is_summer_semester(semester_name: &str) -> bool {
    let number = extract_semester_number(semester_name);
    let academic_year = extract_academic_year(semester_name);

    if number == 3 && academic_year == "2023-2024" {
        return false;
    }

    number == 3
}

fn start_year(academic_year: &str) -> i32 {
    academic_year
        .split('-')
        .next()
        .and_then(|y| y.parse().ok())
        .unwrap_or(0)
}

/// 按时间顺序排列学期并依次分配学年/学期
pub fn map_semesters(semesters: &[TranscriptSemester]) -> Vec<SemesterMapping> {
    let mut sorted: Vec<&TranscriptSemester> = semesters.iter().collect();
    sorted.sort_by_key(|s| {
        (
            start_year(&extract_academic_year(&s.name)),
            extract_semester_number(&s.name),
        )
    });

    let mut mappings = Vec::with_capacity(sorted.len());
    let mut program_year = 1;
    let mut program_semester = 1;

    for semester in sorted {
        let is_summer = is_summer_semester(&semester.name);

        mappings.push(SemesterMapping {
            camu_semester_name: semester.name.clone(),
            academic_year_range: extract_academic_year(&semester.name),
            program_year,
            program_semester: if is_summer { 0 } else { program_semester },
            is_summer,
            course_count: semester.courses.len(),
        });

        if !is_summer {
            program_semester += 1;
            if program_semester > 2 {
                program_year += 1;
                program_semester = 1;
            }
        }
    }

    tracing::debug!(count = mappings.len(), "学期映射完成");
    mappings
}

/// 映射结果是否需要学生核对
///
/// 出现非暑期的第3学期，或正常学期的顺序没有严格递增时需要核对。
pub fn requires_verification(mappings: &[SemesterMapping]) -> bool {
    let has_regular_third_semester = mappings
        .iter()
        .any(|m| extract_semester_number(&m.camu_semester_name) == 3 && !m.is_summer);

    let mut last = (0, 0);
    let mut out_of_sequence = false;
    for m in mappings.iter().filter(|m| !m.is_summer) {
        let current = (m.program_year, m.program_semester);
        if current <= last {
            out_of_sequence = true;
        }
        last = current;
    }

    has_regular_third_semester || out_of_sequence
}

#[cfg(test)]
mod tests {
    use super::*;

    fn semester(name: &str) -> TranscriptSemester {
        TranscriptSemester {
            name: name.to_string(),
            courses: Vec::new(),
            gpa_info: None,
        }
    }

    #[test]
    fn test_extract_academic_year() {
        assert_eq!(extract_academic_year("Semester 1 2021-2022"), "2021-2022");
        assert_eq!(extract_academic_year("Semester 2 2021/2022"), "2021-2022");
        assert_eq!(extract_academic_year("Fall 2021 to Spring 2022"), "2021-2022");
    }

    #[test]
    fn test_extract_academic_year_falls_back_to_current() {
        let year = chrono::Local::now().year();
        assert_eq!(extract_academic_year("Semester 1"), format!("{}-{}", year - 1, year));
    }

    #[test]
    fn test_extract_semester_number() {
        assert_eq!(extract_semester_number("Semester 2 2021-2022"), 2);
        assert_eq!(extract_semester_number("SEMESTER   3 2022-2023"), 3);
        assert_eq!(extract_semester_number("Semester2 2022-2023"), 1);
        assert_eq!(extract_semester_number("Summer 2022"), 1);
        assert_eq!(extract_semester_number("semester2 then Semester 4 2021-2022"), 4);
    }

    #[test]
    fn test_summer_detection() {
        assert!(is_summer_semester("Semester 3 2022-2023"));
        assert!(!is_summer_semester("Semester 3 2023-2024"));
        assert!(!is_summer_semester("Semester 1 2022-2023"));
    }

    #[test]
    fn test_map_semesters_sorts_and_sequences() {
        let semesters = vec![
            semester("Semester 1 2022-2023"),
            semester("Semester 2 2021-2022"),
            semester("Semester 3 2021-2022"),
            semester("Semester 1 2021-2022"),
        ];

        let mappings = map_semesters(&semesters);
        let summary: Vec<(&str, u32, u32, bool)> = mappings
            .iter()
            .map(|m| {
                (
                    m.camu_semester_name.as_str(),
                    m.program_year,
                    m.program_semester,
                    m.is_summer,
                )
            })
            .collect();

        assert_eq!(
            summary,
            vec![
                ("Semester 1 2021-2022", 1, 1, false),
                ("Semester 2 2021-2022", 1, 2, false),
                ("Semester 3 2021-2022", 2, 0, true),
                ("Semester 1 2022-2023", 2, 1, false),
            ]
        );
        assert!(!requires_verification(&mappings));
    }

    #[test]
    fn test_regular_third_semester_needs_verification() {
        let semesters = vec![
            semester("Semester 1 2023-2024"),
            semester("Semester 2 2023-2024"),
            semester("Semester 3 2023-2024"),
        ];
        let mappings = map_semesters(&semesters);
        assert_eq!(mappings[2].program_year, 2);
        assert_eq!(mappings[2].program_semester, 1);
        assert!(requires_verification(&mappings));
    }

    #[test]
    fn test_out_of_sequence_needs_verification() {
        let mappings = vec![
            SemesterMapping {
                camu_semester_name: "Semester 1 2021-2022".to_string(),
                academic_year_range: "2021-2022".to_string(),
                program_year: 1,
                program_semester: 2,
                is_summer: false,
                course_count: 0,
            },
            SemesterMapping {
                camu_semester_name: "Semester 2 2021-2022".to_string(),
                academic_year_range: "2021-2022".to_string(),
                program_year: 1,
                program_semester: 1,
                is_summer: false,
                course_count: 0,
            },
        ];
        assert!(requires_verification(&mappings));
    }
}
