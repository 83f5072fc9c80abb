//! 存储模块 - 配置文件与SQLite目录

pub mod config;
pub mod database;
