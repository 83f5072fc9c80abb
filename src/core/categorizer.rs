//! 课程分类模块
//!
//! 先查分类映射目录，查不到再按院系代码回落。
//! 目录不可用属于错误，必须原样抛给调用方，不能当成 "Uncategorized"。

use crate::core::major;
use crate::core::models::CourseCategorizationMapping;
use crate::core::patterns::normalize_code;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// 无法归类时的分类
pub const UNCATEGORIZED: &str = "Uncategorized";
/// 课程代码没有字母前缀时的院系代码
pub const UNKNOWN_DEPARTMENT: &str = "UNKNOWN";
/// 适用于所有专业的映射分组
pub const ALL_MAJORS: &str = "ALL";

/// 分类映射目录错误
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("数据库连接锁已损坏")]
    LockPoisoned,

    #[error("分类目录不可用: {0}")]
    Unavailable(String),
}

/// 分类映射目录
///
/// 实现方负责专业分组的优先级：完全匹配的专业 > "ALL" > 空分组，
/// 分类器只使用返回的那一条。
#[async_trait]
pub trait MappingLookup: Send + Sync {
    async fn find_mapping(
        &self,
        course_code: &str,
        major_group: &str,
    ) -> Result<Option<CourseCategorizationMapping>, CatalogError>;
}

/// 规范化映射中的专业分组："ALL" 和空分组保持原样，其余换成专业代码
pub fn canonical_major_group(group: Option<&str>) -> Option<String> {
    match group.map(str::trim) {
        None | Some("") => None,
        Some(g) if g.eq_ignore_ascii_case(ALL_MAJORS) => Some(ALL_MAJORS.to_string()),
        Some(g) => Some(major::canonical_major(g)),
    }
}

/// 专业分组的匹配等级，越小越优先
///
/// 两边都按专业代码比较，"Computer Science" 和 "CS" 视为同一分组。
pub(crate) fn major_group_rank(group: Option<&str>, major_group: &str) -> Option<u8> {
    match canonical_major_group(group) {
        None => Some(2),
        Some(g) if g == ALL_MAJORS => Some(1),
        Some(g) if g == major::canonical_major(major_group) => Some(0),
        Some(_) => None,
    }
}

/// 内存中的分类目录
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    mappings: Vec<CourseCategorizationMapping>,
}

impl InMemoryCatalog {
    pub fn new(mappings: Vec<CourseCategorizationMapping>) -> Self {
        Self { mappings }
    }
}

#[async_trait]
impl MappingLookup for InMemoryCatalog {
    async fn find_mapping(
        &self,
        course_code: &str,
        major_group: &str,
    ) -> Result<Option<CourseCategorizationMapping>, CatalogError> {
        let code = normalize_code(course_code);

        // min_by_key 在并列时保留第一个，即插入顺序
        Ok(self
            .mappings
            .iter()
            .filter(|m| normalize_code(&m.course_code) == code)
            .filter_map(|m| major_group_rank(m.major_group.as_deref(), major_group).map(|r| (r, m)))
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, m)| m.clone()))
    }
}

/// 院系回落规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DepartmentRule {
    /// 固定分类
    Fixed { category: String },
    /// 学生专业在 majors 中时为 major_category，否则为 other_category
    MajorConditioned {
        majors: Vec<String>,
        major_category: String,
        other_category: String,
    },
}

impl DepartmentRule {
    fn fixed(category: &str) -> Self {
        DepartmentRule::Fixed {
            category: category.to_string(),
        }
    }

    fn for_majors(majors: &[&str], major_category: &str, other_category: &str) -> Self {
        DepartmentRule::MajorConditioned {
            majors: majors.iter().map(|s| s.to_string()).collect(),
            major_category: major_category.to_string(),
            other_category: other_category.to_string(),
        }
    }

    /// 根据规范化后的专业代码给出分类
    pub fn category_for(&self, major_code: &str) -> &str {
        match self {
            DepartmentRule::Fixed { category } => category.as_str(),
            DepartmentRule::MajorConditioned {
                majors,
                major_category,
                other_category,
            } => {
                if majors
                    .iter()
                    .any(|m| major::canonical_major(m) == major_code)
                {
                    major_category.as_str()
                } else {
                    other_category.as_str()
                }
            }
        }
    }
}

/// 院系代码 -> 分类规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentTable {
    rules: BTreeMap<String, DepartmentRule>,
}

impl Default for DepartmentTable {
    fn default() -> Self {
        let mut table = Self {
            rules: BTreeMap::new(),
        };

        table.insert_all(
            &["CS", "MIS"],
            DepartmentRule::for_majors(&["CS"], "Major Required", "Major Elective"),
        );
        table.insert_all(
            &["BUSN", "MGMT", "ECON", "ACCT", "FINC"],
            DepartmentRule::for_majors(&["BA"], "Major Required", "Business Administration"),
        );
        table.insert_all(&["BUSA"], DepartmentRule::fixed("Business"));
        table.insert_all(
            &["ENGR"],
            DepartmentRule::for_majors(&["CE", "EE", "ME"], "Major Required", "Engineering"),
        );
        table.insert_all(
            &["CE", "EE", "ME"],
            DepartmentRule::for_majors(&["CE", "EE", "ME"], "Major Required", "Major Elective"),
        );
        table.insert_all(
            &["PHYS", "CHEM", "BIOL", "SC", "SCI"],
            DepartmentRule::fixed("Natural Sciences"),
        );
        table.insert_all(&["MATH"], DepartmentRule::fixed("Mathematics & Quantitative"));
        table.insert_all(
            &["IS", "CSIS", "AI", "SYS", "MS"],
            DepartmentRule::fixed("Computing"),
        );
        table.insert_all(
            &["AS", "ENGL", "FRENC", "POLS", "SOAN", "HIST", "PHIL", "HUMN"],
            DepartmentRule::fixed("Humanities & Social Sciences"),
        );
        table.insert_all(&["COMM"], DepartmentRule::fixed("Written & Oral Communication"));
        table.insert_all(
            &["INDS", "LEAD", "ETHN"],
            DepartmentRule::fixed("Leadership & Ethics"),
        );

        table
    }
}

impl DepartmentTable {
    pub fn insert(&mut self, department: &str, rule: DepartmentRule) {
        self.rules.insert(department.trim().to_uppercase(), rule);
    }

    fn insert_all(&mut self, departments: &[&str], rule: DepartmentRule) {
        for department in departments {
            self.insert(department, rule.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 院系回落分类；major_code 需已规范化
    pub fn category_for(&self, department: &str, major_code: &str) -> &str {
        self.rules
            .get(department)
            .map(|rule| rule.category_for(major_code))
            .unwrap_or(UNCATEGORIZED)
    }
}

/// 提取院系代码（如 "CS101" -> "CS"），没有字母前缀时为 "UNKNOWN"
pub fn extract_department_code(course_code: &str) -> String {
    let prefix: String = course_code
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();

    if prefix.is_empty() {
        UNKNOWN_DEPARTMENT.to_string()
    } else {
        prefix.to_ascii_uppercase()
    }
}

/// 确定一门课程的分类
///
/// 目录命中时直接使用映射结果，不再回落到院系表。
/// 每门课程恰好一次目录查询，院系表查找为 O(log D)。
pub async fn categorize_course<C>(
    course_code: &str,
    major: &str,
    catalog: &C,
    departments: &DepartmentTable,
) -> Result<String, CatalogError>
where
    C: MappingLookup + ?Sized,
{
    let clean_code = normalize_code(course_code);
    let major_code = major::canonical_major(major);

    if let Some(mapping) = catalog.find_mapping(&clean_code, &major_code).await? {
        tracing::trace!(
            course = %clean_code,
            major = %major_code,
            group = ?mapping.major_group,
            category = %mapping.category_name,
            "命中分类映射"
        );
        return Ok(mapping.category_name);
    }

    let department = extract_department_code(&clean_code);
    let category = departments.category_for(&department, &major_code);

    tracing::trace!(
        course = %clean_code,
        major = %major_code,
        department = %department,
        category = %category,
        "按院系回落分类"
    );

    Ok(category.to_string())
}

/// 批量分类，最多 concurrency 个查询同时进行，结果按输入顺序返回
///
/// N 门课程共 N 次目录查询（O(N)），任一查询失败即返回该错误。
pub async fn categorize_courses<C>(
    course_codes: &[String],
    major: &str,
    catalog: &C,
    departments: &DepartmentTable,
    concurrency: usize,
) -> Result<Vec<String>, CatalogError>
where
    C: MappingLookup + ?Sized,
{
    let results: Vec<Result<String, CatalogError>> = stream::iter(course_codes)
        .map(|code| categorize_course(code, major, catalog, departments))
        .buffered(concurrency.max(1))
        .collect()
        .await;

    results.into_iter().collect()
}
