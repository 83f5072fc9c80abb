//! Core模块 - 成绩单分析的核心业务逻辑

pub mod models;
pub mod patterns;
pub mod major;
pub mod math_track;
pub mod capstone;
pub mod categorizer;
pub mod credits;
pub mod rule_engine;
pub mod semester;
pub mod validation;
pub mod parser_client;
pub mod importer;

#[cfg(test)]
mod sim_integration_tests;
