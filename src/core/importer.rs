//! 成绩单导入编排
//!
//! 解析结果 -> 专业识别 -> 轨道判定 -> 学期映射 -> 课程代码解析 -> 课程分类 -> 报告。
//! 本模块不写数据库，持久化由调用方决定。

use crate::core::capstone::detect_capstone_option;
use crate::core::categorizer::{categorize_courses, CatalogError, MappingLookup};
use crate::core::credits::{credit_totals, GradingLookup, GradingPolicy};
use crate::core::major;
use crate::core::math_track::detect_math_track;
use crate::core::models::{CategorizedCourse, ImportReport, TranscriptCourse, TranscriptData};
use crate::core::patterns::normalize_code;
use crate::core::rule_engine::RuleSet;
use crate::core::semester::{map_semesters, requires_verification};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;

/// 识别不出专业时使用的专业代码
pub const DEFAULT_MAJOR_CODE: &str = "CS";

/// 课程代码解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCode {
    pub code: String,
    /// 目录中找不到此课程
    pub placeholder: bool,
}

/// 课程代码解析
///
/// 依次查现行课程、代码变更记录、按名称匹配；都找不到时保留原代码并标记为占位。
#[async_trait]
pub trait CourseResolver: Send + Sync {
    async fn resolve_course_code(
        &self,
        code: &str,
        title: &str,
    ) -> Result<ResolvedCode, CatalogError>;
}

/// 导入编排器
pub struct Importer<'a> {
    catalog: &'a dyn MappingLookup,
    resolver: Option<&'a dyn CourseResolver>,
    grading: Option<&'a dyn GradingLookup>,
    rules: &'a RuleSet,
    concurrency: usize,
}

impl<'a> Importer<'a> {
    /// 创建新的导入编排器
    pub fn new(catalog: &'a dyn MappingLookup, rules: &'a RuleSet) -> Self {
        Self {
            catalog,
            resolver: None,
            grading: None,
            rules,
            concurrency: 8,
        }
    }

    /// 设置课程代码解析器
    pub fn with_resolver(mut self, resolver: &'a dyn CourseResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// 设置评分规则来源，未设置时使用内置成绩等级且没有最低成绩要求
    pub fn with_grading(mut self, grading: &'a dyn GradingLookup) -> Self {
        self.grading = Some(grading);
        self
    }

    /// 设置分类查询并发数
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// 确定专业代码：成绩单学位 > 调用方提供的专业 > 默认
    pub fn resolve_major(&self, transcript: &TranscriptData, major_hint: Option<&str>) -> String {
        let from_degree = transcript
            .student_info
            .degree
            .as_deref()
            .and_then(major::extract_major_from_degree);

        for candidate in from_degree.as_deref().into_iter().chain(major_hint) {
            if let Some(code) = major::major_code(candidate) {
                return code.to_string();
            }
        }

        tracing::warn!(
            degree = ?transcript.student_info.degree,
            hint = ?major_hint,
            "无法识别专业，使用默认专业 {}",
            DEFAULT_MAJOR_CODE
        );
        DEFAULT_MAJOR_CODE.to_string()
    }

    /// 执行一次导入
    ///
    /// 分类目录不可用时直接返回错误，不会产生部分报告。
    pub async fn run(&self, transcript: &TranscriptData, major_hint: Option<&str>) -> Result<ImportReport> {
        let student_id = transcript
            .student_info
            .id()
            .context("成绩单中缺少学号")?
            .to_string();

        let major_code = self.resolve_major(transcript, major_hint);
        let courses = transcript.all_courses();

        tracing::info!(
            student = %student_id,
            major = %major_code,
            courses = courses.len(),
            semesters = transcript.semesters.len(),
            "开始导入成绩单"
        );

        let math = detect_math_track(&courses, &self.rules.patterns);
        let capstone = detect_capstone_option(&courses, Some(major_code.as_str()), &self.rules.patterns);
        if capstone.defaulted() {
            tracing::warn!(student = %student_id, "未找到毕业设计课程，使用默认选项 {}", capstone.option);
        }

        let semester_mappings = map_semesters(&transcript.semesters);
        let needs_verification = requires_verification(&semester_mappings);

        let resolved = self.resolve_codes(&courses).await?;
        let resolved_codes: Vec<String> = resolved.iter().map(|r| r.code.clone()).collect();
        let categories = categorize_courses(
            &resolved_codes,
            &major_code,
            self.catalog,
            &self.rules.departments,
            self.concurrency,
        )
        .await?;

        let categorized: Vec<CategorizedCourse> = courses
            .iter()
            .zip(resolved)
            .zip(categories)
            .map(|((course, resolved), category)| {
                let original = normalize_code(&course.code);
                CategorizedCourse {
                    original_code: (original != resolved.code).then_some(original),
                    code: resolved.code,
                    title: course.title.clone(),
                    semester: course.semester.clone(),
                    grade: course.grade.clone(),
                    credits: course.credits,
                    category,
                    placeholder: resolved.placeholder,
                }
            })
            .collect();

        let policy = match self.grading {
            Some(grading) => grading.grading_policy(&major_code).await?,
            None => GradingPolicy::default(),
        };
        let totals = credit_totals(&categorized, &policy);

        tracing::info!(
            student = %student_id,
            math_track = %math.track,
            capstone = %capstone.option,
            needs_verification,
            "成绩单导入完成"
        );

        Ok(ImportReport {
            import_id: uuid::Uuid::new_v4().to_string(),
            imported_at: Utc::now(),
            student_id,
            student_name: transcript.student_info.name.clone(),
            major_code,
            math_track: math.track,
            capstone_option: capstone.option,
            capstone_defaulted: capstone.defaulted(),
            cumulative_gpa: transcript.latest_cgpa(),
            semester_mappings,
            needs_verification,
            courses: categorized,
            totals,
        })
    }

    async fn resolve_codes(&self, courses: &[TranscriptCourse]) -> Result<Vec<ResolvedCode>, CatalogError> {
        let mut resolved = Vec::with_capacity(courses.len());
        for course in courses {
            let code = match self.resolver {
                Some(resolver) => resolver.resolve_course_code(&course.code, &course.title).await?,
                None => ResolvedCode {
                    code: normalize_code(&course.code),
                    placeholder: false,
                },
            };
            resolved.push(code);
        }
        Ok(resolved)
    }
}
