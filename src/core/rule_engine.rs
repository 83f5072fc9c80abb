//! 规则集模块
//!
//! 负责分类规则的加载、导出和检查。
//! 规则集 = 轨道匹配表 + 院系回落表，以只读引用传给各个分类器，
//! 测试时可以直接注入另一套规则。

use crate::core::categorizer::DepartmentTable;
use crate::core::patterns::PatternTables;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 分类规则集
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// 轨道匹配表
    pub patterns: PatternTables,
    /// 院系回落表
    pub departments: DepartmentTable,
}

impl RuleSet {
    /// 从JSON加载规则，缺失部分使用内置规则
    pub fn load_from_json(json_str: &str) -> Result<Self> {
        let rules: RuleSet = serde_json::from_str(json_str).context("规则文件格式错误")?;
        rules.warn_ambiguities();
        Ok(rules)
    }

    /// 从文件加载规则
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取规则文件失败: {}", path.display()))?;
        let rules = Self::load_from_json(&content)?;
        if rules.departments.is_empty() {
            tracing::warn!(path = %path.display(), "规则文件中院系表为空，未匹配映射的课程都将归为 Uncategorized");
        }
        tracing::info!(
            path = %path.display(),
            departments = rules.departments.len(),
            "已加载分类规则"
        );
        Ok(rules)
    }

    /// 导出规则为JSON
    pub fn export_to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 报告无法区分的毕业设计分组
    ///
    /// 只记录警告，不修改规则：排在后面的分组在这种情况下永远不会被判定。
    pub fn warn_ambiguities(&self) -> Vec<(&'static str, &'static str)> {
        let pairs = self.patterns.indistinguishable_capstone_groups();
        for (first, second) in &pairs {
            tracing::warn!(
                first = *first,
                second = *second,
                "毕业设计分组使用相同的课程代码，{} 永远不会被判定",
                second
            );
        }
        pairs
    }
}
