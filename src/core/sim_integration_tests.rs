use crate::core::importer::Importer;
use crate::core::models::{
    CapstoneOption, CatalogCourse, CodeHistoryEntry, CourseCategorizationMapping,
    CourseGradeRequirement, MathTrack, SeedData,
};
use crate::core::rule_engine::RuleSet;
use crate::core::validation::parse_transcript_value;
use crate::storage::database::Database;
use serde_json::{json, Value};
use tempfile::tempdir;

fn seed_data() -> SeedData {
    SeedData {
        mappings: vec![
            CourseCategorizationMapping::new("MATH141", Some("ALL"), "Core Mathematics"),
            CourseCategorizationMapping::new("CS213", Some("CS"), "Computing Core"),
            CourseCategorizationMapping::new("CS213", Some("ALL"), "Computing Elective"),
        ],
        courses: vec![
            CatalogCourse {
                code: "MATH141".to_string(),
                title: "Calculus I".to_string(),
            },
            CatalogCourse {
                code: "CS112".to_string(),
                title: "Computer Programming I".to_string(),
            },
            CatalogCourse {
                code: "CS213".to_string(),
                title: "Object Oriented Programming".to_string(),
            },
            CatalogCourse {
                code: "ENGL112".to_string(),
                title: "Written and Oral Communication".to_string(),
            },
        ],
        code_history: vec![CodeHistoryEntry {
            historical_code: "CS211".to_string(),
            current_code: "CS213".to_string(),
        }],
        grade_requirements: vec![CourseGradeRequirement {
            major_code: "CS".to_string(),
            course_code: "ENGL112".to_string(),
            minimum_grade: "C+".to_string(),
        }],
        ..Default::default()
    }
}

fn camu_export() -> Value {
    json!({
        "studentInfo": {
            "student_roll_no": "10212025",
            "name": "Efua Asante",
            "degree": "B.Sc - Computer Science",
            "date_of_admission": "2021-08-23"
        },
        "semesters": [
            {
                "name": "Semester 1 2021-2022",
                "courses": [
                    {"code": "MATH 141", "title": "Calculus I", "credits": 1.0, "grade": "A"},
                    {"code": "CS112", "title": "Computer Programming I", "credits": 1.0, "grade": "B+"},
                    {"code": "ENGL112", "title": "Written and Oral Communication", "credits": 1.0, "grade": "C"}
                ],
                "gpaInfo": {"gpa": "3.22", "cgpa": "3.22"}
            },
            {
                "name": "Semester 2 2021-2022",
                "courses": [
                    {"code": "CS211", "title": "Object Oriented Programming", "credits": 1.0, "grade": "B"},
                    {"code": "CS491", "title": "Undergraduate Thesis I", "credits": 1.0, "grade": "A-"},
                    {"code": "ART101", "title": "Drawing", "credits": 1.0, "grade": "F"}
                ],
                "gpaInfo": {"gpa": "2.90", "cgpa": "3.06"}
            }
        ]
    })
}

#[tokio::test]
async fn sim_import_from_seeded_catalog_to_saved_report() {
    let dir = tempdir().unwrap();
    let db = Database::open(&dir.path().join("catalog.db")).unwrap();
    db.seed(&seed_data()).unwrap();

    let transcript = parse_transcript_value(camu_export()).unwrap();
    let rules = RuleSet::default();
    let report = Importer::new(&db, &rules)
        .with_resolver(&db)
        .with_grading(&db)
        .with_concurrency(2)
        .run(&transcript, None)
        .await
        .unwrap();

    assert_eq!(report.student_id, "10212025");
    assert_eq!(report.major_code, "CS");
    assert_eq!(report.math_track, MathTrack::Calculus);
    assert_eq!(report.capstone_option, CapstoneOption::UndergraduateThesis);
    assert!(!report.capstone_defaulted);
    assert_eq!(report.cumulative_gpa.as_deref(), Some("3.06"));

    // 课程顺序与成绩单一致
    let summary: Vec<(&str, &str, bool)> = report
        .courses
        .iter()
        .map(|c| (c.code.as_str(), c.category.as_str(), c.placeholder))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("MATH141", "Core Mathematics", false),
            ("CS112", "Major Required", false),
            ("ENGL112", "Humanities & Social Sciences", false),
            ("CS213", "Computing Core", false),
            ("CS491", "Major Required", true),
            ("ART101", "Uncategorized", true),
        ]
    );
    assert_eq!(report.courses[3].original_code.as_deref(), Some("CS211"));
    assert_eq!(report.courses[0].original_code, None);

    assert_eq!(report.semester_mappings.len(), 2);
    assert_eq!(
        (report.semester_mappings[1].program_year, report.semester_mappings[1].program_semester),
        (1, 2)
    );
    assert!(!report.needs_verification);

    // ENGL112 的 C 低于CS专业要求的 C+，ART101 不及格
    assert_eq!(report.totals.courses_total, 6);
    assert_eq!(report.totals.credits_taken, 6.0);
    assert_eq!(report.totals.courses_passed, 4);
    assert_eq!(report.totals.credits_passed, 4.0);

    db.save_import(&report, Some("abc123")).unwrap();
    let history = db.load_recent_imports("10212025", 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].source_sha256.as_deref(), Some("abc123"));

    let reloaded = db.load_import(&report.import_id).unwrap().unwrap();
    assert_eq!(reloaded.courses, report.courses);
}

#[tokio::test]
async fn sim_same_transcript_differs_by_major_only_where_rules_say_so() {
    let db = Database::open_in_memory().unwrap();
    db.seed(&seed_data()).unwrap();

    let transcript = parse_transcript_value(camu_export()).unwrap();
    let rules = RuleSet::default();

    // 学位中的专业优先于提示
    let as_cs = Importer::new(&db, &rules)
        .run(&transcript, Some("Business Administration"))
        .await
        .unwrap();
    assert_eq!(as_cs.major_code, "CS");

    let mut ba_transcript = transcript.clone();
    ba_transcript.student_info.degree = Some("B.Sc - Business Administration".to_string());
    let as_ba = Importer::new(&db, &rules)
        .run(&ba_transcript, None)
        .await
        .unwrap();
    assert_eq!(as_ba.major_code, "BA");

    let category = |report: &crate::core::models::ImportReport, code: &str| {
        report
            .courses
            .iter()
            .find(|c| c.code == code)
            .map(|c| c.category.clone())
            .unwrap()
    };

    // 没有解析器时保留原始代码
    assert_eq!(category(&as_cs, "CS211"), "Major Required");
    assert_eq!(category(&as_ba, "CS211"), "Major Elective");
    assert_eq!(category(&as_ba, "MATH141"), "Core Mathematics");
    assert_eq!(category(&as_ba, "ENGL112"), category(&as_cs, "ENGL112"));
}

#[tokio::test]
async fn sim_rejects_export_without_semesters() {
    let mut data = camu_export();
    data["semesters"] = json!([]);

    let err = parse_transcript_value(data).unwrap_err();
    assert!(err.to_string().contains("No semester data found"));
}
