//! 核心数据模型定义
//!
//! 成绩单解析服务输出的结构、分类映射记录、轨道标签以及导入报告。
//! 解析服务的字段名沿用其JSON格式（studentInfo、gpaInfo等）。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 成绩单中的一门课程
/// 由外部解析服务产生，分类过程只读不写
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptCourse {
    /// 课程代码（如 "MATH141"，可能带空格）
    pub code: String,
    /// 课程名称
    pub title: String,
    /// 学分
    #[serde(default)]
    pub credits: Option<f64>,
    /// 成绩
    #[serde(default)]
    pub grade: Option<String>,
    /// 所属学期名称
    #[serde(default)]
    pub semester: Option<String>,
}

impl TranscriptCourse {
    /// 仅用代码和名称创建课程
    pub fn new(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            credits: None,
            grade: None,
            semester: None,
        }
    }

    /// 附加学分和成绩
    pub fn with_result(mut self, credits: f64, grade: impl Into<String>) -> Self {
        self.credits = Some(credits);
        self.grade = Some(grade.into());
        self
    }
}

/// 学期GPA信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpaInfo {
    #[serde(default)]
    pub ca: String,
    #[serde(default)]
    pub cr: String,
    #[serde(default)]
    pub cp: String,
    #[serde(default)]
    pub gp: String,
    #[serde(default)]
    pub gpa: String,
    #[serde(default)]
    pub cgpa: String,
}

/// 成绩单中的一个学期
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSemester {
    /// CAMU学期名称（如 "Semester 1 2021-2022"）
    pub name: String,
    #[serde(default)]
    pub courses: Vec<TranscriptCourse>,
    #[serde(rename = "gpaInfo", default)]
    pub gpa_info: Option<GpaInfo>,
}

/// 学生基本信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentInfo {
    #[serde(default)]
    pub student_roll_no: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date_of_admission: Option<String>,
    #[serde(default)]
    pub faculty: Option<String>,
    #[serde(default)]
    pub degree: Option<String>,
}

impl StudentInfo {
    /// 学号：CAMU导出优先使用 student_roll_no
    pub fn id(&self) -> Option<&str> {
        [self.student_roll_no.as_deref(), self.student_id.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
    }
}

/// 解析后的完整成绩单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptData {
    #[serde(rename = "studentInfo")]
    pub student_info: StudentInfo,
    #[serde(default)]
    pub semesters: Vec<TranscriptSemester>,
}

impl TranscriptData {
    /// 所有学期的课程，按成绩单顺序展开，并补上学期名称
    pub fn all_courses(&self) -> Vec<TranscriptCourse> {
        self.semesters
            .iter()
            .flat_map(|semester| {
                semester.courses.iter().map(move |course| {
                    let mut course = course.clone();
                    if course.semester.is_none() {
                        course.semester = Some(semester.name.clone());
                    }
                    course
                })
            })
            .collect()
    }

    /// 最后一个学期的累计GPA
    pub fn latest_cgpa(&self) -> Option<String> {
        self.semesters
            .last()
            .and_then(|s| s.gpa_info.as_ref())
            .map(|g| g.cgpa.clone())
            .filter(|c| !c.is_empty())
    }
}

/// 课程分类映射记录
/// major_group 为具体专业代码、"ALL" 或空（任意专业）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCategorizationMapping {
    pub course_code: String,
    #[serde(default)]
    pub major_group: Option<String>,
    pub category_name: String,
}

impl CourseCategorizationMapping {
    pub fn new(
        course_code: impl Into<String>,
        major_group: Option<&str>,
        category_name: impl Into<String>,
    ) -> Self {
        Self {
            course_code: course_code.into(),
            major_group: major_group.map(str::to_string),
            category_name: category_name.into(),
        }
    }
}

/// 课程目录中的一门课程
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCourse {
    pub code: String,
    pub title: String,
}

/// 课程代码变更记录（旧代码 -> 现行代码）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeHistoryEntry {
    pub historical_code: String,
    pub current_code: String,
}

/// 成绩等级（如 "B+" = 3.33，及格）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeType {
    pub grade: String,
    pub numeric_value: f64,
    #[serde(default = "default_is_passing")]
    pub is_passing: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_is_passing() -> bool {
    true
}

impl GradeType {
    pub fn new(grade: &str, numeric_value: f64, is_passing: bool) -> Self {
        Self {
            grade: grade.to_string(),
            numeric_value,
            is_passing,
            description: None,
        }
    }
}

/// 某专业对某门课程的最低成绩要求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseGradeRequirement {
    pub major_code: String,
    pub course_code: String,
    pub minimum_grade: String,
}

/// 目录种子数据（JSON文件）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedData {
    #[serde(default)]
    pub mappings: Vec<CourseCategorizationMapping>,
    #[serde(default)]
    pub courses: Vec<CatalogCourse>,
    #[serde(default)]
    pub code_history: Vec<CodeHistoryEntry>,
    #[serde(default)]
    pub grade_types: Vec<GradeType>,
    #[serde(default)]
    pub grade_requirements: Vec<CourseGradeRequirement>,
}

/// 数学轨道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MathTrack {
    #[serde(rename = "Calculus")]
    Calculus,
    #[serde(rename = "Pre-Calculus")]
    PreCalculus,
}

impl MathTrack {
    pub fn label(&self) -> &'static str {
        match self {
            MathTrack::Calculus => "Calculus",
            MathTrack::PreCalculus => "Pre-Calculus",
        }
    }
}

impl std::fmt::Display for MathTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 毕业设计（Capstone）选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapstoneOption {
    #[serde(rename = "Undergraduate Thesis")]
    UndergraduateThesis,
    #[serde(rename = "Entrepreneurship")]
    Entrepreneurship,
    #[serde(rename = "Engineering Senior Project")]
    EngineeringSeniorProject,
    #[serde(rename = "Applied Project")]
    AppliedProject,
}

impl CapstoneOption {
    pub fn label(&self) -> &'static str {
        match self {
            CapstoneOption::UndergraduateThesis => "Undergraduate Thesis",
            CapstoneOption::Entrepreneurship => "Entrepreneurship",
            CapstoneOption::EngineeringSeniorProject => "Engineering Senior Project",
            CapstoneOption::AppliedProject => "Applied Project",
        }
    }
}

impl std::fmt::Display for CapstoneOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 学期映射：CAMU学期 -> 培养方案中的学年/学期
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterMapping {
    pub camu_semester_name: String,
    pub academic_year_range: String,
    pub program_year: u32,
    /// 暑期学期为0
    pub program_semester: u32,
    pub is_summer: bool,
    pub course_count: usize,
}

/// 已分类的课程
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedCourse {
    /// 解析后的课程代码（可能来自代码变更记录或按名称匹配）
    pub code: String,
    /// 成绩单上的原始代码（仅当与解析后代码不同时）
    pub original_code: Option<String>,
    pub title: String,
    pub semester: Option<String>,
    pub grade: Option<String>,
    pub credits: Option<f64>,
    pub category: String,
    /// 目录中找不到对应课程
    pub placeholder: bool,
}

/// 学分统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditTotals {
    pub credits_passed: f64,
    pub credits_taken: f64,
    pub courses_passed: usize,
    pub courses_total: usize,
}

/// 一次导入的结果报告
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// 导入ID
    pub import_id: String,
    /// 导入时间
    pub imported_at: DateTime<Utc>,
    pub student_id: String,
    pub student_name: String,
    /// 专业代码
    pub major_code: String,
    pub math_track: MathTrack,
    pub capstone_option: CapstoneOption,
    /// 毕业设计选项是否为默认值（学生可在核对时修改）
    pub capstone_defaulted: bool,
    pub cumulative_gpa: Option<String>,
    pub semester_mappings: Vec<SemesterMapping>,
    /// 学期映射是否需要人工核对
    pub needs_verification: bool,
    pub courses: Vec<CategorizedCourse>,
    pub totals: CreditTotals,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 成绩单解析服务地址
    pub parser_endpoint: String,
    /// SQLite数据库路径（为空时放在配置目录下）
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// 规则文件路径（覆盖内置匹配表和院系表）
    #[serde(default)]
    pub rules_path: Option<PathBuf>,
    /// 分类查询的最大并发数
    pub catalog_concurrency: usize,
    /// 上传文件大小上限（字节）
    pub max_upload_bytes: u64,
    /// 解析服务请求超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            parser_endpoint: "http://localhost:5000".to_string(),
            database_path: None,
            rules_path: None,
            catalog_concurrency: 8,
            max_upload_bytes: 10 * 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_deserialize_camu_shape() {
        let json = r#"{
            "studentInfo": {"student_roll_no": "12342025", "name": "Ama Mensah", "degree": "B.Sc - Computer Science"},
            "semesters": [
                {"name": "Semester 1 2021-2022",
                 "courses": [{"code": "MATH 141", "title": "Calculus I", "credits": 1.0, "grade": "B+"}],
                 "gpaInfo": {"gpa": "3.30", "cgpa": "3.30"}}
            ]
        }"#;

        let data: TranscriptData = serde_json::from_str(json).unwrap();
        assert_eq!(data.student_info.id(), Some("12342025"));
        assert_eq!(data.latest_cgpa().as_deref(), Some("3.30"));

        let courses = data.all_courses();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].semester.as_deref(), Some("Semester 1 2021-2022"));
        assert_eq!(courses[0].grade.as_deref(), Some("B+"));
    }

    #[test]
    fn test_track_labels_serialize_as_display_names() {
        assert_eq!(
            serde_json::to_string(&MathTrack::PreCalculus).unwrap(),
            "\"Pre-Calculus\""
        );
        assert_eq!(
            CapstoneOption::EngineeringSeniorProject.to_string(),
            "Engineering Senior Project"
        );
    }

    #[test]
    fn test_student_id_falls_back_to_student_id_field() {
        let info = StudentInfo {
            student_roll_no: Some("  ".to_string()),
            student_id: Some("A1".to_string()),
            ..Default::default()
        };
        // 空白的 roll_no 不算有效学号
        assert_eq!(info.id(), Some("A1"));
        assert_eq!(StudentInfo::default().id(), None);
    }
}
