//! 专业识别
//!
//! 成绩单上的学位字符串、学生填写的专业名称和目录里的专业代码写法不一致，
//! 这里统一换算成专业代码（CS、BA、MIS、CE、EE、ME）。

/// 专业全称 -> 专业代码
const MAJOR_NAMES: &[(&str, &str)] = &[
    ("Computer Science", "CS"),
    ("Business Administration", "BA"),
    ("Management Information Systems", "MIS"),
    ("Computer Engineering", "CE"),
    ("Electrical and Electronic Engineering", "EE"),
    ("Mechanical Engineering", "ME"),
];

/// 工程类专业
const ENGINEERING_MAJORS: &[&str] = &["CE", "EE", "ME"];

/// 从学位字符串中提取专业名称
/// 支持 "B.Sc - Computer Science" 格式，其他格式按关键词判断
pub fn extract_major_from_degree(degree: &str) -> Option<String> {
    let mut parts = degree.split(" - ");
    if let (Some(_), Some(major)) = (parts.next(), parts.next()) {
        let major = major.trim();
        if !major.is_empty() {
            return Some(major.to_string());
        }
    }

    let keywords = [
        ("Computer Science", "Computer Science"),
        ("Business Admin", "Business Administration"),
        ("MIS", "Management Information Systems"),
        ("Computer Engineering", "Computer Engineering"),
        (
            "Electrical and Electronic Engineering",
            "Electrical and Electronic Engineering",
        ),
        ("Mechanical Engineering", "Mechanical Engineering"),
    ];

    keywords
        .iter()
        .find(|(keyword, _)| degree.contains(*keyword))
        .map(|(_, name)| name.to_string())
}

/// 专业名称或代码 -> 专业代码
/// 依次尝试：已是代码、全称完全匹配、输入中包含全称
pub fn major_code(name_or_code: &str) -> Option<&'static str> {
    let trimmed = name_or_code.trim();

    if let Some((_, code)) = MAJOR_NAMES
        .iter()
        .find(|(_, code)| code.eq_ignore_ascii_case(trimmed))
    {
        return Some(*code);
    }

    if let Some((_, code)) = MAJOR_NAMES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
    {
        return Some(*code);
    }

    let lowered = trimmed.to_lowercase();
    MAJOR_NAMES
        .iter()
        .find(|(name, _)| lowered.contains(&name.to_lowercase()))
        .map(|(_, code)| *code)
}

/// 规范化专业：能识别的换成代码，否则保留大写原文
pub fn canonical_major(name_or_code: &str) -> String {
    match major_code(name_or_code) {
        Some(code) => code.to_string(),
        None => name_or_code.trim().to_uppercase(),
    }
}

/// 是否为工程类专业
pub fn is_engineering(name_or_code: &str) -> bool {
    let code = canonical_major(name_or_code);
    ENGINEERING_MAJORS.contains(&code.as_str())
}
