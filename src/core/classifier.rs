//! 类别分类器
//!
//! 根据页面摘要判断词条是否属于某类别。只有布尔结果，没有置信度。

use crate::core::keywords::KeywordTable;
use crate::core::models::CategoryRule;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

/// 命中的关键词类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// 独立单词
    WholeWord,
    /// 词尾
    Suffix,
}

/// 一次命中
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch {
    pub keyword: String,
    pub kind: MatchKind,
}

/// 预编译的类别规则
struct CompiledRule {
    patterns: Vec<(KeywordMatch, Regex)>,
}

impl CompiledRule {
    fn compile(rule: &CategoryRule) -> Self {
        let whole = rule
            .whole_words
            .iter()
            .map(|k| (k, MatchKind::WholeWord, format!(r"\b{}\b", regex::escape(k.trim()))));
        let suffix = rule
            .suffixes
            .iter()
            .map(|k| (k, MatchKind::Suffix, format!(r"{}\b", regex::escape(k.trim()))));

        let patterns = whole
            .chain(suffix)
            .filter(|(k, _, _)| !k.trim().is_empty())
            .filter_map(|(keyword, kind, pattern)| {
                match RegexBuilder::new(&pattern).case_insensitive(true).build() {
                    Ok(re) => Some((
                        KeywordMatch {
                            keyword: keyword.clone(),
                            kind,
                        },
                        re,
                    )),
                    Err(e) => {
                        tracing::warn!("关键词 '{}' 无法编译，已忽略: {}", keyword, e);
                        None
                    }
                }
            })
            .collect();

        Self { patterns }
    }
}

/// 类别分类器
pub struct CategoryClassifier {
    rules: HashMap<String, CompiledRule>,
}

impl CategoryClassifier {
    /// 由规则表构建分类器
    pub fn new(table: &KeywordTable) -> Self {
        let rules = table
            .get_rules()
            .iter()
            .map(|r| (r.category.to_lowercase(), CompiledRule::compile(r)))
            .collect();
        Self { rules }
    }

    /// 查找摘要中第一个命中的关键词
    pub fn find_match(&self, summary: &str, category: &str) -> Option<KeywordMatch> {
        let rule = self.rules.get(&category.to_lowercase())?;
        rule.patterns
            .iter()
            .find(|(_, re)| re.is_match(summary))
            .map(|(m, _)| m.clone())
    }

    /// 摘要是否支持该类别
    pub fn classifies(&self, summary: &str, category: &str) -> bool {
        if !self.rules.contains_key(&category.to_lowercase()) {
            tracing::warn!("类别 '{}' 没有匹配规则", category);
            return false;
        }

        match self.find_match(summary, category) {
            Some(m) => {
                tracing::debug!("类别 '{}' 命中关键词 '{}' ({:?})", category, m.keyword, m.kind);
                true
            }
            None => {
                let preview: String = summary.chars().take(200).collect();
                tracing::info!("摘要中没有类别 '{}' 的关键词", category);
                tracing::debug!("摘要: {}...", preview);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn river_only() -> CategoryClassifier {
        let mut table = KeywordTable::empty();
        table.add_rule(CategoryRule::new("River", &["river"], &["fluss"]));
        CategoryClassifier::new(&table)
    }

    #[test]
    fn test_suffix_match_on_standalone_word() {
        let classifier = river_only();
        assert!(classifier.classifies("der rhein ist ein großer fluss in europa", "River"));

        let m = classifier
            .find_match("der rhein ist ein großer fluss in europa", "River")
            .unwrap();
        assert_eq!(m.kind, MatchKind::Suffix);
        assert_eq!(m.keyword, "fluss");
    }

    #[test]
    fn test_suffix_match_inside_compound_word() {
        let classifier = river_only();
        assert!(classifier.classifies("Die Isar ist ein Nebenfluss der Donau.", "River"));
        assert!(classifier.classifies("Der Grenzfluss trennt zwei Länder.", "River"));
    }

    #[test]
    fn test_suffix_must_end_the_word() {
        let classifier = river_only();
        assert!(!classifier.classifies("Der Flussbarsch ist ein Fisch.", "River"));
    }

    #[test]
    fn test_whole_word_requires_boundaries() {
        let classifier = CategoryClassifier::new(&KeywordTable::new());
        assert!(classifier.classifies("Frankreich ist ein Staat in Westeuropa.", "Country"));
        assert!(!classifier.classifies("Deutschlands größte Stadt", "Country"));
        assert!(classifier.classifies("The Thames is a river in England.", "river"));
        assert!(!classifier.classifies("Riverside is a neighbourhood.", "River"));
    }

    #[test]
    fn test_case_insensitive_umlauts() {
        let classifier = CategoryClassifier::new(&KeywordTable::new());
        assert!(classifier.classifies("Die AMSEL ist ein SINGVOGEL.", "Animal"));
        assert!(classifier.classifies("Eine bekannte Zimmerpflanze.", "Plant"));
    }

    #[test]
    fn test_builtin_rules_avoid_common_false_positives() {
        let classifier = CategoryClassifier::new(&KeywordTable::new());
        assert!(!classifier.classifies("Das Quartier Latin ist ein Stadtviertel in Paris.", "Animal"));
        assert!(!classifier.classifies("Der Portier öffnet die Tür.", "Animal"));
        assert!(!classifier.classifies("Bayern ist ein Land im Südosten Deutschlands.", "Country"));

        assert!(classifier.classifies("Der Luchs ist ein Säugetier aus der Familie der Katzen.", "Animal"));
        assert!(classifier.classifies("Der Hund ist ein Haustier.", "Animal"));
        assert!(classifier.classifies("Luxemburg ist ein Binnenstaat in Westeuropa.", "Country"));
    }

    #[test]
    fn test_unknown_category_never_matches() {
        let classifier = CategoryClassifier::new(&KeywordTable::new());
        assert!(!classifier.classifies("Ein großer Fluss.", "Brand"));
    }
}
