//! 配置文件管理模块

use crate::core::models::AppConfig;
use crate::core::rule_engine::RuleSet;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// 配置管理器
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// 创建配置管理器
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// 获取默认配置路径
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "semesterise", "Semesterise")
            .map(|d| d.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// 加载配置
    pub fn load(&self) -> Result<AppConfig> {
        if self.config_path.exists() {
            let content = std::fs::read_to_string(&self.config_path)?;
            serde_json::from_str(&content)
                .with_context(|| format!("配置文件格式错误: {}", self.config_path.display()))
        } else {
            Ok(AppConfig::default())
        }
    }

    /// 保存配置
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        // 确保目录存在
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// 重置为默认配置
    pub fn reset(&self) -> Result<()> {
        self.save(&AppConfig::default())
    }

    /// 数据库路径，未配置时放在配置文件旁边
    pub fn database_path(&self, config: &AppConfig) -> PathBuf {
        match &config.database_path {
            Some(path) => path.clone(),
            None => self
                .config_path
                .parent()
                .map(|p| p.join("semesterise.db"))
                .unwrap_or_else(|| PathBuf::from("semesterise.db")),
        }
    }

    /// 加载分类规则，未配置规则文件时使用内置规则
    pub fn load_rules(&self, config: &AppConfig) -> Result<RuleSet> {
        match &config.rules_path {
            Some(path) => RuleSet::load_from_file(path),
            None => {
                let rules = RuleSet::default();
                rules.warn_ambiguities();
                Ok(rules)
            }
        }
    }
}
