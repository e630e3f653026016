//! 类别关键词规则表
//!
//! 每个类别对应两组关键词：独立单词与词尾。
//! 摘要来自德语维基百科，因此内置规则同时包含德语和英语关键词。

use crate::core::models::CategoryRule;
use anyhow::{Context, Result};
use std::path::Path;

/// 关键词规则表
#[derive(Debug, Clone)]
pub struct KeywordTable {
    rules: Vec<CategoryRule>,
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordTable {
    /// 创建带内置规则的规则表
    pub fn new() -> Self {
        let mut table = Self::empty();
        table.load_builtin_rules();
        table
    }

    /// 创建空规则表
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// 加载内置规则
    fn load_builtin_rules(&mut self) {
        let builtin_rules = vec![
            CategoryRule::new(
                "City",
                &[
                    "city", "cities", "town", "settlement", "municipality",
                    "stadt", "städte", "gemeinde", "metropole", "ortschaft",
                ],
                &["stadt", "städte", "metropole"],
            ),
            CategoryRule::new(
                "Country",
                &[
                    "country", "countries", "nation", "state", "republic",
                    "sovereign state", "staat", "königreich", "republik",
                    "inselstaat", "binnenstaat",
                ],
                &["staat", "staaten", "republik", "königreich", "monarchie", "fürstentum"],
            ),
            CategoryRule::new(
                "River",
                &["river", "rivers", "watercourse", "fluss", "strom", "nebenfluss"],
                &["fluss", "flüsse", "flusses", "gewässer", "strom"],
            ),
            CategoryRule::new(
                "Plant",
                &[
                    "plant", "flora", "tree", "flower", "fungus", "shrub",
                    "pflanze", "baum", "blume", "pilz", "strauch", "pflanzenart",
                ],
                &["pflanze", "pflanzen", "gewächs", "gewächse", "baum", "bäume", "blume", "blumen"],
            ),
            CategoryRule::new(
                "Animal",
                &[
                    "animal", "fauna", "mammal", "bird", "insect", "fish", "reptile",
                    "amphibian", "tier", "vogel", "fisch", "insekt", "reptil", "amphibie",
                    "tierart",
                ],
                &[
                    "tierart", "tierarten", "säugetier", "säugetiere", "haustier", "haustiere",
                    "raubtier", "raubtiere", "vogel", "vögel", "fisch", "fische", "insekt", "insekten",
                ],
            ),
        ];

        for rule in builtin_rules {
            self.add_rule(rule);
        }
    }

    /// 添加规则，同名类别的规则会被替换
    pub fn add_rule(&mut self, rule: CategoryRule) {
        match self
            .rules
            .iter_mut()
            .find(|r| r.category.eq_ignore_ascii_case(&rule.category))
        {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    /// 查找某类别的规则（类别名忽略大小写）
    pub fn get_rule(&self, category: &str) -> Option<&CategoryRule> {
        self.rules
            .iter()
            .find(|r| r.category.eq_ignore_ascii_case(category))
    }

    /// 获取所有规则
    pub fn get_rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// 从JSON加载规则（覆盖同名类别）
    pub fn load_from_json(&mut self, json_str: &str) -> Result<usize> {
        let rules: Vec<CategoryRule> = serde_json::from_str(json_str)?;
        let count = rules.len();
        for rule in rules {
            self.add_rule(rule);
        }
        Ok(count)
    }

    /// 从规则文件加载
    pub fn load_from_file(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取规则文件失败: {}", path.display()))?;
        self.load_from_json(&content)
            .with_context(|| format!("解析规则文件失败: {}", path.display()))
    }

    /// 导出规则为JSON
    pub fn export_to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.rules)?)
    }
}
