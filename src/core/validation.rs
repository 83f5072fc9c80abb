//! 成绩单内容校验
//!
//! 解析服务返回的是任意JSON，这里先确认它确实是一份成绩单，
//! 再判断它有多像CAMU导出的格式。

use crate::core::models::TranscriptData;
use anyhow::Result;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

/// 校验失败的原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub error: String,
    pub details: String,
}

impl ValidationFailure {
    fn new(error: &str, details: &str) -> Self {
        Self {
            error: error.to_string(),
            details: details.to_string(),
        }
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.details)
    }
}

impl std::error::Error for ValidationFailure {}

/// CAMU格式评估
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CamuAssessment {
    pub is_camu: bool,
    /// 0-100
    pub confidence: u32,
    pub reasons: Vec<String>,
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(_) => true,
    }
}

/// 检查解析结果是否包含成绩单的基本组成部分
pub fn validate_transcript_content(data: &Value) -> Result<(), ValidationFailure> {
    if data.is_null() {
        return Err(ValidationFailure::new(
            "No data was extracted from the file",
            "The uploaded file could not be parsed or contains no data. Please ensure you're uploading a valid transcript export from CAMU.",
        ));
    }

    let student_info = data.get("studentInfo");
    if !is_present(student_info) {
        return Err(ValidationFailure::new(
            "Missing student information",
            "The file doesn't contain basic student information. Please ensure you're uploading a complete transcript export from CAMU.",
        ));
    }

    if !is_present(data.pointer("/studentInfo/student_roll_no"))
        && !is_present(data.pointer("/studentInfo/student_id"))
    {
        return Err(ValidationFailure::new(
            "Missing student ID",
            "The file doesn't contain your student ID. Please ensure you're uploading a complete transcript export.",
        ));
    }

    if !is_present(data.pointer("/studentInfo/name")) {
        return Err(ValidationFailure::new(
            "Missing student name",
            "The file doesn't contain your name. Please ensure you're uploading a complete transcript export.",
        ));
    }

    let semesters = match data.get("semesters").and_then(Value::as_array) {
        Some(semesters) if !semesters.is_empty() => semesters,
        _ => {
            return Err(ValidationFailure::new(
                "No semester data found",
                "The transcript doesn't contain any semester information. Please ensure you're uploading a complete academic transcript export.",
            ))
        }
    };

    let first_semester = &semesters[0];
    let courses = match first_semester.get("courses").and_then(Value::as_array) {
        Some(courses) if is_present(first_semester.get("name")) => courses,
        _ => {
            return Err(ValidationFailure::new(
                "Invalid semester data structure",
                "The semester data in the transcript is incomplete or malformed. Please ensure you're exporting the transcript correctly from CAMU.",
            ))
        }
    };

    let Some(first_course) = courses.first() else {
        return Err(ValidationFailure::new(
            "No course data found",
            "The transcript doesn't contain any course information. Please ensure you're uploading a complete academic transcript with course data.",
        ));
    };

    if !is_present(first_course.get("code"))
        || !is_present(first_course.get("title"))
        || first_course.get("credits").is_none()
        || first_course.get("grade").is_none()
    {
        return Err(ValidationFailure::new(
            "Invalid course data structure",
            "The course data in the transcript is incomplete or malformed. A valid transcript should include course codes, titles, credits, and grades.",
        ));
    }

    if !is_present(first_semester.get("gpaInfo")) {
        return Err(ValidationFailure::new(
            "Missing GPA information",
            "The transcript doesn't contain GPA information. Please ensure you're uploading a complete academic transcript.",
        ));
    }

    Ok(())
}

/// CAMU学期名称："semester <数字> <yyyy>-<yyyy>"
static CAMU_SEMESTER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)semester\s+\d+\s+\d{4}-\d{4}").expect("Invalid CAMU semester regex")
});

/// CAMU成绩：A-F，可带 + 或 -
static CAMU_GRADE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-F][+\-]?$").expect("Invalid CAMU grade regex"));

fn looks_like_camu_semester_name(name: &str) -> bool {
    CAMU_SEMESTER_REGEX.is_match(name)
}

fn looks_like_camu_grade(grade: &str) -> bool {
    CAMU_GRADE_REGEX.is_match(grade)
}

/// 评估解析结果有多像CAMU导出的成绩单，达到60分视为CAMU
pub fn assess_camu_transcript(data: &Value) -> CamuAssessment {
    let mut confidence = 0;
    let mut reasons = Vec::new();

    if data
        .pointer("/studentInfo/degree")
        .and_then(Value::as_str)
        .is_some()
    {
        confidence += 20;
        reasons.push("Contains degree information".to_string());
    }

    if is_present(data.pointer("/studentInfo/date_of_admission")) {
        confidence += 15;
        reasons.push("Contains admission date".to_string());
    }

    let semesters = data
        .get("semesters")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    if semesters.iter().any(|s| {
        s.get("name")
            .and_then(Value::as_str)
            .map(looks_like_camu_semester_name)
            .unwrap_or(false)
    }) {
        confidence += 25;
        reasons.push("Contains CAMU-formatted semester names".to_string());
    }

    let first = semesters.first();

    if let Some(gpa) = first.and_then(|s| s.get("gpaInfo")).and_then(Value::as_object) {
        if gpa.contains_key("cgpa") && gpa.contains_key("gpa") {
            confidence += 20;
            reasons.push("Contains CAMU-style GPA information".to_string());
        }
    }

    let has_camu_grades = first
        .and_then(|s| s.get("courses"))
        .and_then(Value::as_array)
        .map(|courses| {
            courses.iter().any(|c| {
                c.get("grade")
                    .and_then(Value::as_str)
                    .map(looks_like_camu_grade)
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false);
    if has_camu_grades {
        confidence += 20;
        reasons.push("Contains CAMU-style course grades".to_string());
    }

    CamuAssessment {
        is_camu: confidence >= 60,
        confidence,
        reasons,
    }
}

/// 校验后转换为成绩单结构
pub fn parse_transcript_value(data: Value) -> Result<TranscriptData> {
    validate_transcript_content(&data)?;

    let assessment = assess_camu_transcript(&data);
    if !assessment.is_camu {
        tracing::warn!(
            confidence = assessment.confidence,
            reasons = ?assessment.reasons,
            "成绩单不太像CAMU导出格式"
        );
    }

    Ok(serde_json::from_value(data)?)
}
