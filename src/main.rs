//! Semesterise - 成绩单分析与课程分类工具
//!
//! 读取CAMU导出的成绩单，判定数学轨道和毕业设计选项，
//! 把每门课程归入学位要求分类，生成可供审核的导入报告。

pub mod core;
pub mod storage;

use crate::core::categorizer::categorize_course;
use crate::core::importer::Importer;
use crate::core::models::{AppConfig, ImportReport, SeedData, TranscriptData};
use crate::core::parser_client::ParserClient;
use crate::core::rule_engine::RuleSet;
use crate::core::validation::parse_transcript_value;
use crate::storage::config::ConfigManager;
use crate::storage::database::Database;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "semesterise", version, about = "成绩单分析与课程分类")]
struct Cli {
    /// 配置文件路径
    #[arg(long, global = true, env = "SEMESTERISE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 配置文件管理
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// 分类规则管理
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },
    #[command(flatten)]
    Catalog(CatalogCommand),
}

/// 需要打开数据库的命令
#[derive(Subcommand)]
enum CatalogCommand {
    /// 分析已解析的成绩单JSON
    Classify {
        transcript: PathBuf,
        /// 学位中识别不出专业时使用
        #[arg(long)]
        major: Option<String>,
    },
    /// 上传成绩单文件到解析服务，分析并保存报告
    Import {
        file: PathBuf,
        #[arg(long)]
        major: Option<String>,
    },
    /// 查询单门课程的分类
    Categorize {
        code: String,
        #[arg(long)]
        major: String,
    },
    /// 导入分类映射、课程目录和代码变更记录
    Seed { data: PathBuf },
    /// 查看学生的导入历史
    History {
        student_id: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// 输出指定导入的完整报告
        #[arg(long)]
        show: Option<String>,
    },
    /// 解析服务健康检查
    Health,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// 显示当前配置
    Show,
    /// 写出当前配置（文件不存在时写入默认配置）
    Init,
    /// 重置为默认配置
    Reset,
}

#[derive(Subcommand)]
enum RulesAction {
    /// 导出当前生效的规则，可作为规则文件的起点
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// 运行时上下文
struct App {
    config: AppConfig,
    rules: RuleSet,
    db: Database,
}

impl App {
    fn load(manager: &ConfigManager) -> Result<Self> {
        let config = manager.load()?;
        let rules = manager.load_rules(&config)?;
        let db_path = manager.database_path(&config);
        let db = Database::open(&db_path)
            .with_context(|| format!("打开数据库失败: {}", db_path.display()))?;

        tracing::debug!(
            config = %manager.config_path().display(),
            database = %db_path.display(),
            "配置已加载"
        );

        Ok(Self { config, rules, db })
    }

    fn parser_client(&self) -> Result<ParserClient> {
        ParserClient::new(
            &self.config.parser_endpoint,
            Duration::from_secs(self.config.request_timeout_secs),
            self.config.max_upload_bytes,
        )
    }

    async fn analyze(&self, transcript: &TranscriptData, major: Option<&str>) -> Result<ImportReport> {
        Importer::new(&self.db, &self.rules)
            .with_resolver(&self.db)
            .with_grading(&self.db)
            .with_concurrency(self.config.catalog_concurrency)
            .run(transcript, major)
            .await
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("读取文件失败: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("JSON格式错误: {}", path.display()))
}

/// 配置和规则命令不需要打开数据库
fn run_config(manager: &ConfigManager, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print_json(&serde_json::json!({
                "path": manager.config_path(),
                "config": manager.load()?,
            }))?;
        }
        ConfigAction::Init => {
            manager.save(&manager.load()?)?;
            tracing::info!(path = %manager.config_path().display(), "配置已写入");
        }
        ConfigAction::Reset => {
            manager.reset()?;
            tracing::info!(path = %manager.config_path().display(), "配置已重置");
        }
    }
    Ok(())
}

fn run_rules(manager: &ConfigManager, action: RulesAction) -> Result<()> {
    match action {
        RulesAction::Export { output } => {
            let rules = manager.load_rules(&manager.load()?)?;
            let json = rules.export_to_json()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("写入规则文件失败: {}", path.display()))?;
                    tracing::info!(path = %path.display(), "规则已导出");
                }
                None => println!("{}", json),
            }
        }
    }
    Ok(())
}

async fn run_catalog(app: &App, command: CatalogCommand) -> Result<()> {
    match command {
        CatalogCommand::Classify { transcript, major } => {
            let transcript = parse_transcript_value(read_json(&transcript)?)?;
            let report = app.analyze(&transcript, major.as_deref()).await?;
            print_json(&report)?;
        }
        CatalogCommand::Import { file, major } => {
            let parsed = app.parser_client()?.parse_file(&file).await?;
            tracing::info!(
                file = %parsed.file_name,
                size = parsed.size,
                sha256 = %parsed.sha256,
                "解析服务已返回成绩单"
            );

            let transcript = parse_transcript_value(parsed.data)?;
            let report = app.analyze(&transcript, major.as_deref()).await?;
            app.db.save_import(&report, Some(&parsed.sha256))?;
            tracing::info!(import_id = %report.import_id, "导入报告已保存");
            print_json(&report)?;
        }
        CatalogCommand::Categorize { code, major } => {
            let category = categorize_course(&code, &major, &app.db, &app.rules.departments).await?;
            println!("{}", category);
        }
        CatalogCommand::Seed { data } => {
            let seed: SeedData = serde_json::from_value(read_json(&data)?)
                .with_context(|| format!("种子数据格式错误: {}", data.display()))?;
            let count = app.db.seed(&seed)?;
            println!("已写入 {} 条记录", count);
        }
        CatalogCommand::History {
            show: Some(import_id),
            ..
        } => {
            let report = app
                .db
                .load_import(&import_id)?
                .with_context(|| format!("找不到导入记录: {}", import_id))?;
            print_json(&report)?;
        }
        CatalogCommand::History {
            student_id,
            limit,
            show: None,
        } => {
            for record in app.db.load_recent_imports(&student_id, limit)? {
                println!(
                    "{}\t{}\t{}",
                    record.imported_at,
                    record.import_id,
                    record.source_sha256.as_deref().unwrap_or("-")
                );
            }
        }
        CatalogCommand::Health => {
            let client = app.parser_client()?;
            let status = client.health().await?;
            tracing::info!(endpoint = client.endpoint(), "解析服务可用");
            print_json(&status)?;
        }
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let manager = ConfigManager::new(cli.config.unwrap_or_else(ConfigManager::default_path));

    match cli.command {
        Command::Config { action } => run_config(&manager, action),
        Command::Rules { action } => run_rules(&manager, action),
        Command::Catalog(command) => run_catalog(&App::load(&manager)?, command).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志（输出到stderr，stdout留给报告）
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    run(Cli::parse()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["semesterise", "config", "reset"]).unwrap();
        assert!(matches!(cli.command, Command::Config { action: ConfigAction::Reset }));

        let cli = Cli::try_parse_from(["semesterise", "rules", "export", "--output", "r.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Rules { action: RulesAction::Export { output: Some(_) } }
        ));

        let cli = Cli::try_parse_from(["semesterise", "history", "10212025", "--show", "abc"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Catalog(CatalogCommand::History { show: Some(_), limit: 10, .. })
        ));

        let cli = Cli::try_parse_from(["semesterise", "categorize", "CS101", "--major", "CS"]).unwrap();
        assert!(matches!(cli.command, Command::Catalog(CatalogCommand::Categorize { .. })));
    }

    #[test]
    fn test_config_init_and_reset() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().join("config.json"));

        run_config(&manager, ConfigAction::Init).unwrap();
        assert!(manager.config_path().exists());

        let mut config = manager.load().unwrap();
        config.catalog_concurrency = 3;
        manager.save(&config).unwrap();
        run_config(&manager, ConfigAction::Init).unwrap();
        assert_eq!(manager.load().unwrap().catalog_concurrency, 3);

        run_config(&manager, ConfigAction::Reset).unwrap();
        assert_eq!(manager.load().unwrap().catalog_concurrency, AppConfig::default().catalog_concurrency);
    }

    #[test]
    fn test_rules_export_to_file() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().join("config.json"));
        let output = dir.path().join("rules.json");

        run_rules(&manager, RulesAction::Export { output: Some(output.clone()) }).unwrap();

        let exported = RuleSet::load_from_file(&output).unwrap();
        assert_eq!(exported, RuleSet::default());
    }

    #[test]
    fn test_config_commands_do_not_open_database() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().join("config.json"));

        run_config(&manager, ConfigAction::Show).unwrap();
        run_rules(&manager, RulesAction::Export { output: Some(dir.path().join("r.json")) }).unwrap();
        assert!(!manager.database_path(&AppConfig::default()).exists());
    }
}
