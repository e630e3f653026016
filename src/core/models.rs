//! 核心数据模型定义
//!
//! 一局游戏的数据流：Round -> Submission -> ValidationResult -> GameRecord。

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// 每个通过验证的词条得分
pub const POINTS_PER_TERM: u32 = 10;

/// 历史记录中的日期格式
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// 一局游戏
/// 开局时创建，创建后不可修改
#[derive(Debug, Clone)]
pub struct Round {
    /// 本局字母（大写）
    pub letter: char,
    /// 本局类别（有序）
    pub categories: Vec<String>,
    /// 开局时间
    pub started_at: DateTime<Local>,
    /// 截止时刻
    pub deadline: Instant,
}

impl Round {
    /// 创建新的一局
    pub fn new(letter: char, categories: Vec<String>, time_limit: Duration) -> Self {
        Self {
            letter: letter.to_ascii_uppercase(),
            categories,
            started_at: Local::now(),
            deadline: Instant::now() + time_limit,
        }
    }

    /// 剩余时间
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// 是否已超时
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// 检查词条是否以本局字母开头（忽略大小写）
    pub fn accepts_initial(&self, term: &str) -> bool {
        starts_with_letter(term, self.letter)
    }
}

/// 判断词条首字母（忽略首尾空白与大小写）
pub fn starts_with_letter(term: &str, letter: char) -> bool {
    match term.trim().chars().next() {
        Some(first) => first.to_lowercase().eq(letter.to_lowercase()),
        None => false,
    }
}

/// 玩家提交的答案：类别 -> 原始输入
/// 保持类别顺序，未填写的类别为空字符串
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    entries: Vec<(String, String)>,
}

impl Submission {
    /// 为给定类别创建空提交
    pub fn for_categories(categories: &[String]) -> Self {
        Self {
            entries: categories
                .iter()
                .map(|c| (c.clone(), String::new()))
                .collect(),
        }
    }

    /// 填写某类别的答案，类别不存在时追加
    pub fn set(&mut self, category: &str, term: impl Into<String>) {
        let term = term.into();
        match self.entries.iter_mut().find(|(c, _)| c == category) {
            Some(entry) => entry.1 = term,
            None => self.entries.push((category.to_string(), term)),
        }
    }

    /// 获取某类别的答案
    pub fn get(&self, category: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, t)| t.as_str())
    }

    /// 按类别顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, t)| (c.as_str(), t.as_str()))
    }

    /// 已填写（非空白）的答案数
    pub fn filled_count(&self) -> usize {
        self.entries.iter().filter(|(_, t)| !t.trim().is_empty()).count()
    }
}

/// 单个类别的验证结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub term: String,
    pub category: String,
    pub verified: bool,
}

/// 一局的持久化记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    /// 日期
    pub date: NaiveDate,
    /// 本局字母
    pub letter: char,
    /// 类别 -> 被认可的词条（未认可为空）
    pub terms: BTreeMap<String, String>,
    /// 得分
    pub points: u32,
}

impl GameRecord {
    /// 由认可的词条构建记录，分数按词条数计算
    pub fn new(date: NaiveDate, letter: char, terms: BTreeMap<String, String>) -> Self {
        let filled = terms.values().filter(|t| !t.trim().is_empty()).count() as u32;
        Self {
            date,
            letter,
            terms,
            points: filled * POINTS_PER_TERM,
        }
    }

    /// 某类别的词条
    pub fn term(&self, category: &str) -> &str {
        self.terms.get(category).map(String::as_str).unwrap_or("")
    }
}

/// 已验证词条缓存项
/// 唯一性基于（小写词条, 类别）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedTermEntry {
    #[serde(rename = "Term")]
    pub term: String,
    #[serde(rename = "Category")]
    pub category: String,
}

impl VerifiedTermEntry {
    pub fn new(term: &str, category: &str) -> Self {
        Self {
            term: term.trim().to_string(),
            category: category.to_string(),
        }
    }

    /// 去重键
    pub fn key(&self) -> (String, String) {
        (self.term.to_lowercase(), self.category.clone())
    }
}

/// 类别匹配规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// 类别名称
    pub category: String,
    /// 必须作为独立单词出现的关键词
    #[serde(default)]
    pub whole_words: Vec<String>,
    /// 作为单词结尾出现即可的关键词（复合词）
    #[serde(default)]
    pub suffixes: Vec<String>,
}

impl CategoryRule {
    pub fn new(category: &str, whole_words: &[&str], suffixes: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            whole_words: whole_words.iter().map(|s| s.to_string()).collect(),
            suffixes: suffixes.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// 外部知识源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// MediaWiki API 端点
    pub api_endpoint: String,
    /// 请求超时（秒）
    pub timeout_secs: u64,
    /// User-Agent（维基百科要求标识客户端）
    pub user_agent: String,
    /// 歧义页最多尝试的选项数
    pub max_ambiguity_options: usize,
    /// 全文搜索兜底时检查的结果数
    pub search_fallback_results: usize,
    /// 是否启用拼写纠正查询
    pub suggestion_enabled: bool,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://de.wikipedia.org/w/api.php".to_string(),
            timeout_secs: 10,
            user_agent: concat!("stadtlandfluss/", env!("CARGO_PKG_VERSION")).to_string(),
            max_ambiguity_options: 5,
            search_fallback_results: 3,
            suggestion_enabled: true,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 当前启用的类别
    pub categories: Vec<String>,
    /// 每局时间限制（秒）
    pub time_limit_secs: u64,
    /// 历史记录默认显示条数
    pub history_games_to_show: usize,
    /// 数据目录（为空时使用系统默认目录）
    pub data_dir: Option<PathBuf>,
    /// 自定义类别规则文件（JSON）
    pub rules_file: Option<PathBuf>,
    /// 知识源配置
    pub lookup: LookupConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            categories: ["City", "Country", "River", "Plant", "Animal"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            time_limit_secs: 60,
            history_games_to_show: 10,
            data_dir: None,
            rules_file: None,
            lookup: LookupConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs)
    }
}
