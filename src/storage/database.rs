//! 数据库存储模块
//!
//! 使用SQLite存储课程分类映射、课程目录、课程代码变更记录、评分规则和导入历史

use crate::core::categorizer::{canonical_major_group, CatalogError, MappingLookup, ALL_MAJORS};
use crate::core::major::canonical_major;
use crate::core::credits::{standard_grade_types, GradingLookup, GradingPolicy};
use crate::core::importer::{CourseResolver, ResolvedCode};
use crate::core::models::{
    CatalogCourse, CodeHistoryEntry, CourseCategorizationMapping, CourseGradeRequirement,
    GradeType, ImportReport, SeedData,
};
use crate::core::patterns::normalize_code;
use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// 导入历史摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub import_id: String,
    pub student_id: String,
    pub imported_at: String,
    pub source_sha256: Option<String>,
}

/// 数据库管理器
///
/// 连接放在互斥锁里，分类查询可以从多个任务并发发起。
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// 打开或创建数据库
    pub fn open(path: &Path) -> Result<Self> {
        // 确保目录存在
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// 内存数据库
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_tables()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn.lock().map_err(|_| CatalogError::LockPoisoned)
    }

    /// 初始化表结构
    fn init_tables(&self) -> Result<()> {
        self.lock()?.execute_batch(
            r#"
            -- 课程分类映射表
            CREATE TABLE IF NOT EXISTS course_categorization (
                course_code TEXT NOT NULL,
                major_group TEXT,
                category_name TEXT NOT NULL
            );

            -- 课程目录
            CREATE TABLE IF NOT EXISTS courses (
                code TEXT PRIMARY KEY,
                title TEXT NOT NULL
            );

            -- 课程代码变更记录
            CREATE TABLE IF NOT EXISTS course_code_history (
                historical_code TEXT PRIMARY KEY,
                current_code TEXT NOT NULL
            );

            -- 成绩等级
            CREATE TABLE IF NOT EXISTS grade_types (
                grade TEXT PRIMARY KEY,
                numeric_value REAL NOT NULL,
                description TEXT,
                is_passing INTEGER NOT NULL DEFAULT 1
            );

            -- 课程最低成绩要求
            CREATE TABLE IF NOT EXISTS course_grade_requirements (
                major_code TEXT NOT NULL,
                course_code TEXT NOT NULL,
                minimum_grade TEXT NOT NULL,
                PRIMARY KEY (major_code, course_code)
            );

            -- 导入历史
            CREATE TABLE IF NOT EXISTS transcript_imports (
                import_id TEXT PRIMARY KEY,
                student_id TEXT NOT NULL,
                imported_at TEXT NOT NULL,
                source_sha256 TEXT,
                report_json TEXT NOT NULL
            );

            -- 创建索引
            CREATE INDEX IF NOT EXISTS idx_categorization_code ON course_categorization(course_code);
            CREATE INDEX IF NOT EXISTS idx_courses_title ON courses(title);
            CREATE INDEX IF NOT EXISTS idx_imports_student ON transcript_imports(student_id, imported_at DESC);
            "#,
        )?;
        Ok(())
    }

    /// 保存分类映射（课程代码和专业分组统一规范化）
    pub fn save_mapping(&self, mapping: &CourseCategorizationMapping) -> Result<()> {
        let major_group = canonical_major_group(mapping.major_group.as_deref());

        self.lock()?.execute(
            r#"
            INSERT INTO course_categorization (course_code, major_group, category_name)
            VALUES (?1, ?2, ?3)
            "#,
            params![
                normalize_code(&mapping.course_code),
                major_group,
                mapping.category_name,
            ],
        )?;
        Ok(())
    }

    /// 保存课程
    pub fn save_course(&self, course: &CatalogCourse) -> Result<()> {
        self.lock()?.execute(
            "INSERT OR REPLACE INTO courses (code, title) VALUES (?1, ?2)",
            params![normalize_code(&course.code), course.title.trim()],
        )?;
        Ok(())
    }

    /// 保存课程代码变更记录
    pub fn save_code_history(&self, entry: &CodeHistoryEntry) -> Result<()> {
        self.lock()?.execute(
            r#"
            INSERT OR REPLACE INTO course_code_history (historical_code, current_code)
            VALUES (?1, ?2)
            "#,
            params![
                normalize_code(&entry.historical_code),
                normalize_code(&entry.current_code),
            ],
        )?;
        Ok(())
    }

    /// 保存成绩等级
    pub fn save_grade_type(&self, grade_type: &GradeType) -> Result<()> {
        self.lock()?.execute(
            r#"
            INSERT OR REPLACE INTO grade_types (grade, numeric_value, description, is_passing)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                grade_type.grade.trim().to_uppercase(),
                grade_type.numeric_value,
                grade_type.description,
                grade_type.is_passing,
            ],
        )?;
        Ok(())
    }

    /// 保存课程最低成绩要求（专业统一为专业代码）
    pub fn save_grade_requirement(&self, requirement: &CourseGradeRequirement) -> Result<()> {
        self.lock()?.execute(
            r#"
            INSERT OR REPLACE INTO course_grade_requirements (major_code, course_code, minimum_grade)
            VALUES (?1, ?2, ?3)
            "#,
            params![
                canonical_major(&requirement.major_code),
                normalize_code(&requirement.course_code),
                requirement.minimum_grade.trim().to_uppercase(),
            ],
        )?;
        Ok(())
    }

    /// 导入种子数据，返回写入的记录数
    pub fn seed(&self, data: &SeedData) -> Result<usize> {
        for mapping in &data.mappings {
            self.save_mapping(mapping)?;
        }
        for course in &data.courses {
            self.save_course(course)?;
        }
        for entry in &data.code_history {
            self.save_code_history(entry)?;
        }
        for grade_type in &data.grade_types {
            self.save_grade_type(grade_type)?;
        }
        for requirement in &data.grade_requirements {
            self.save_grade_requirement(requirement)?;
        }

        let total = data.mappings.len()
            + data.courses.len()
            + data.code_history.len()
            + data.grade_types.len()
            + data.grade_requirements.len();
        tracing::info!(
            mappings = data.mappings.len(),
            courses = data.courses.len(),
            code_history = data.code_history.len(),
            grade_types = data.grade_types.len(),
            grade_requirements = data.grade_requirements.len(),
            "已导入目录种子数据"
        );
        Ok(total)
    }

    /// 加载某专业的评分规则，没有成绩等级数据时使用内置等级表
    pub fn query_grading_policy(&self, major_code: &str) -> Result<GradingPolicy, CatalogError> {
        let major_code = canonical_major(major_code);
        let conn = self.lock()?;

        let mut stmt = conn.prepare_cached(
            "SELECT grade, numeric_value, description, is_passing FROM grade_types",
        )?;
        let mut grade_types = stmt
            .query_map([], |row| {
                Ok(GradeType {
                    grade: row.get(0)?,
                    numeric_value: row.get(1)?,
                    description: row.get(2)?,
                    is_passing: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        if grade_types.is_empty() {
            tracing::debug!("数据库中没有成绩等级，使用内置等级表");
            grade_types = standard_grade_types();
        }

        let mut stmt = conn.prepare_cached(
            r#"
            SELECT major_code, course_code, minimum_grade
            FROM course_grade_requirements
            WHERE major_code = ?1
            "#,
        )?;
        let requirements = stmt
            .query_map(params![major_code], |row| {
                Ok(CourseGradeRequirement {
                    major_code: row.get(0)?,
                    course_code: row.get(1)?,
                    minimum_grade: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(GradingPolicy::new(&grade_types, &requirements, &major_code))
    }

    /// 查询分类映射：完全匹配的专业 > "ALL" > 空分组，同级取最早写入的
    pub fn query_mapping(
        &self,
        course_code: &str,
        major_group: &str,
    ) -> Result<Option<CourseCategorizationMapping>, CatalogError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            r#"
            SELECT course_code, major_group, category_name
            FROM course_categorization
            WHERE course_code = ?1
              AND (major_group = ?2 COLLATE NOCASE
                   OR major_group = ?3 COLLATE NOCASE
                   OR major_group IS NULL)
            ORDER BY CASE
                WHEN major_group = ?2 COLLATE NOCASE THEN 0
                WHEN major_group = ?3 COLLATE NOCASE THEN 1
                ELSE 2
            END, rowid
            LIMIT 1
            "#,
        )?;

        let mapping = stmt
            .query_row(
                params![normalize_code(course_code), canonical_major(major_group), ALL_MAJORS],
                |row| {
                    Ok(CourseCategorizationMapping {
                        course_code: row.get(0)?,
                        major_group: row.get(1)?,
                        category_name: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(mapping)
    }

    /// 解析课程代码：现行课程 > 代码变更记录 > 按名称匹配 > 占位
    pub fn query_course_code(&self, code: &str, title: &str) -> Result<ResolvedCode, CatalogError> {
        let clean_code = normalize_code(code);
        let conn = self.lock()?;

        let known: Option<String> = conn
            .query_row(
                "SELECT code FROM courses WHERE code = ?1",
                params![clean_code],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(code) = known {
            return Ok(ResolvedCode {
                code,
                placeholder: false,
            });
        }

        let renamed: Option<String> = conn
            .query_row(
                "SELECT current_code FROM course_code_history WHERE historical_code = ?1",
                params![clean_code],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(code) = renamed {
            return Ok(ResolvedCode {
                code,
                placeholder: false,
            });
        }

        let by_title: Option<String> = conn
            .query_row(
                "SELECT code FROM courses WHERE title = ?1 COLLATE NOCASE LIMIT 1",
                params![title.trim()],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(code) = by_title {
            return Ok(ResolvedCode {
                code,
                placeholder: false,
            });
        }

        tracing::debug!(code = %clean_code, title, "课程目录中没有此课程，标记为占位");
        Ok(ResolvedCode {
            code: clean_code,
            placeholder: true,
        })
    }

    /// 保存导入报告
    pub fn save_import(&self, report: &ImportReport, source_sha256: Option<&str>) -> Result<()> {
        let report_json = serde_json::to_string(report)?;

        self.lock()?.execute(
            r#"
            INSERT OR REPLACE INTO transcript_imports
            (import_id, student_id, imported_at, source_sha256, report_json)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                report.import_id,
                report.student_id,
                report.imported_at.to_rfc3339(),
                source_sha256,
                report_json,
            ],
        )?;
        Ok(())
    }

    /// 加载学生最近的导入记录
    pub fn load_recent_imports(&self, student_id: &str, limit: usize) -> Result<Vec<ImportRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT import_id, student_id, imported_at, source_sha256
            FROM transcript_imports
            WHERE student_id = ?1
            ORDER BY imported_at DESC
            LIMIT ?2
            "#,
        )?;

        let records = stmt.query_map(params![student_id, limit as i64], |row| {
            Ok(ImportRecord {
                import_id: row.get(0)?,
                student_id: row.get(1)?,
                imported_at: row.get(2)?,
                source_sha256: row.get(3)?,
            })
        })?;

        records.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// 加载完整导入报告
    pub fn load_import(&self, import_id: &str) -> Result<Option<ImportReport>> {
        let conn = self.lock()?;
        let report_json: Option<String> = conn
            .query_row(
                "SELECT report_json FROM transcript_imports WHERE import_id = ?1",
                params![import_id],
                |row| row.get(0),
            )
            .optional()?;

        match report_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl MappingLookup for Database {
    async fn find_mapping(
        &self,
        course_code: &str,
        major_group: &str,
    ) -> Result<Option<CourseCategorizationMapping>, CatalogError> {
        self.query_mapping(course_code, major_group)
    }
}

#[async_trait]
impl CourseResolver for Database {
    async fn resolve_course_code(&self, code: &str, title: &str) -> Result<ResolvedCode, CatalogError> {
        self.query_course_code(code, title)
    }
}

#[async_trait]
impl GradingLookup for Database {
    async fn grading_policy(&self, major_code: &str) -> Result<GradingPolicy, CatalogError> {
        self.query_grading_policy(major_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.seed(&SeedData {
            mappings: vec![
                CourseCategorizationMapping::new("MATH 141", None, "Any Major"),
                CourseCategorizationMapping::new("MATH141", Some("ALL"), "All Majors"),
                CourseCategorizationMapping::new("MATH141", Some("CS"), "CS Specific"),
                CourseCategorizationMapping::new("ENGL112", Some(" "), "Africana"),
                CourseCategorizationMapping::new("PHYS201", Some("Computer Science"), "CS Science Requirement"),
            ],
            courses: vec![CatalogCourse {
                code: "CS112".to_string(),
                title: "Computer Programming for CS".to_string(),
            }],
            code_history: vec![CodeHistoryEntry {
                historical_code: "CS 111".to_string(),
                current_code: "CS112".to_string(),
            }],
            grade_requirements: vec![CourseGradeRequirement {
                major_code: "Computer Science".to_string(),
                course_code: "CS 112".to_string(),
                minimum_grade: "c".to_string(),
            }],
            ..Default::default()
        })
        .unwrap();
        db
    }

    #[test]
    fn test_database_init() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("test.db");

        let _db = Database::open(&db_path).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_mapping_precedence() {
        let db = seeded();

        let hit = db.query_mapping("MATH141", "CS").unwrap().unwrap();
        assert_eq!(hit.category_name, "CS Specific");

        let hit = db.query_mapping("math 141", "ba").unwrap().unwrap();
        assert_eq!(hit.category_name, "All Majors");

        // 空白分组按空分组存储
        let hit = db.query_mapping("ENGL112", "EE").unwrap().unwrap();
        assert_eq!(hit.category_name, "Africana");
        assert_eq!(hit.major_group, None);

        assert!(db.query_mapping("CHEM101", "CS").unwrap().is_none());
    }

    #[test]
    fn test_resolve_course_code() {
        let db = seeded();

        let known = db.query_course_code("CS 112", "whatever").unwrap();
        assert_eq!(known, ResolvedCode { code: "CS112".to_string(), placeholder: false });

        let renamed = db.query_course_code("CS111", "Old Programming").unwrap();
        assert_eq!(renamed.code, "CS112");

        let by_title = db
            .query_course_code("XFER9", "computer programming for cs")
            .unwrap();
        assert_eq!(by_title.code, "CS112");

        let missing = db.query_course_code("ART 101", "Drawing").unwrap();
        assert_eq!(missing, ResolvedCode { code: "ART101".to_string(), placeholder: true });
    }

    #[tokio::test]
    async fn test_database_is_a_mapping_lookup() {
        let db = seeded();
        let lookup: &dyn MappingLookup = &db;
        let hit = lookup.find_mapping("MATH141", "EE").await.unwrap().unwrap();
        assert_eq!(hit.category_name, "All Majors");
    }

    #[test]
    fn test_full_name_major_group_is_stored_as_code() {
        let db = seeded();

        let hit = db.query_mapping("PHYS201", "Computer Science").unwrap().unwrap();
        assert_eq!(hit.category_name, "CS Science Requirement");
        assert_eq!(hit.major_group.as_deref(), Some("CS"));

        let hit = db.query_mapping("PHYS201", "cs").unwrap().unwrap();
        assert_eq!(hit.category_name, "CS Science Requirement");

        assert!(db.query_mapping("PHYS201", "BA").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_database_categorizes_full_name_major() {
        let db = seeded();
        let departments = crate::core::categorizer::DepartmentTable::default();
        let category =
            crate::core::categorizer::categorize_course("PHYS201", "Computer Science", &db, &departments)
                .await
                .unwrap();
        assert_eq!(category, "CS Science Requirement");
    }

    #[test]
    fn test_grading_policy_from_database() {
        let db = seeded();

        // 没有成绩等级数据时使用内置等级表
        let policy = db.query_grading_policy("CS").unwrap();
        assert_eq!(policy.minimum_grade("CS112"), Some("C"));
        assert!(!policy.course_passes("CS112", "D"));
        assert!(policy.course_passes("CS112", "C+"));

        let policy = db.query_grading_policy("Business Administration").unwrap();
        assert_eq!(policy.minimum_grade("CS112"), None);
        assert!(policy.course_passes("CS112", "D"));

        // 自定义等级表：D 不及格
        db.save_grade_type(&GradeType::new("D", 1.0, false)).unwrap();
        db.save_grade_type(&GradeType::new("C", 2.0, true)).unwrap();
        let policy = db.query_grading_policy("BA").unwrap();
        assert!(!policy.course_passes("CS112", "D"));
        assert!(!policy.course_passes("CS112", "B"));
    }

    #[test]
    fn test_load_import_missing() {
        let db = seeded();
        assert!(db.load_import("no-such-import").unwrap().is_none());
    }
}
