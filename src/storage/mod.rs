//! 存储模块 - 配置、已验证词条缓存与游戏历史

pub mod config;
pub mod game_log;
pub mod verified_terms;
