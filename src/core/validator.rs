//! 词条验证
//!
//! 流程：本地检查 -> 缓存 -> 页面解析 -> 关键词分类 -> 写回缓存。
//! 任何外部错误都只记录日志并视为未通过，验证结果永远是布尔值。

use crate::core::classifier::CategoryClassifier;
use crate::core::lookup::{KnowledgeSource, PageLookup};
use crate::core::models::{starts_with_letter, LookupConfig, Round, Submission, ValidationResult};
use crate::core::resolver::{PageResolver, ResolveOutcome, ResolveStrategy};
use crate::storage::verified_terms::VerifiedTermStore;

/// 词条验证器
pub struct Validator<'a, S: KnowledgeSource + ?Sized> {
    source: &'a S,
    classifier: &'a CategoryClassifier,
    resolver: PageResolver,
    search_fallback_results: usize,
}

impl<'a, S: KnowledgeSource + ?Sized> Validator<'a, S> {
    /// 创建验证器
    pub fn new(source: &'a S, classifier: &'a CategoryClassifier, config: &LookupConfig) -> Self {
        let mut resolver = PageResolver::new(config.max_ambiguity_options);
        if !config.suggestion_enabled {
            let strategies = resolver
                .strategies()
                .iter()
                .copied()
                .filter(|s| *s != ResolveStrategy::Suggestion)
                .collect();
            resolver = resolver.with_strategies(strategies);
        }

        Self {
            source,
            classifier,
            resolver,
            search_fallback_results: config.search_fallback_results,
        }
    }

    /// 验证单个词条
    pub async fn validate(
        &self,
        cache: &mut VerifiedTermStore,
        term: &str,
        category: &str,
        letter: char,
    ) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return false;
        }

        if !starts_with_letter(term, letter) {
            tracing::warn!("跳过 '{}': 不是以字母 '{}' 开头", term, letter);
            return false;
        }

        if cache.is_term_verified(term, category) {
            tracing::info!("'{}' 已在缓存中确认属于 {}", term, category);
            return true;
        }

        let verified = self.lookup_verdict(term, category).await;

        if verified {
            tracing::info!("'{}' 验证通过，类别 {}", term, category);
            if let Err(e) = cache.add_verified_term(term, category) {
                tracing::error!("写入词条缓存失败: {}", e);
            }
        } else {
            tracing::warn!("'{}' 无法确认属于类别 {}", term, category);
        }

        verified
    }

    /// 按类别顺序验证整份提交
    pub async fn validate_submission(
        &self,
        cache: &mut VerifiedTermStore,
        round: &Round,
        submission: &Submission,
    ) -> Vec<ValidationResult> {
        let mut results = Vec::new();
        for (category, term) in submission.iter() {
            let verified = self.validate(cache, term, category, round.letter).await;
            results.push(ValidationResult {
                term: term.trim().to_string(),
                category: category.to_string(),
                verified,
            });
        }
        results
    }

    /// 查询知识源并判断
    async fn lookup_verdict(&self, term: &str, category: &str) -> bool {
        let checked_title = match self.resolver.resolve(self.source, term).await {
            ResolveOutcome::Ambiguous(options) => {
                for option in &options {
                    if self.classify_title(option, category).await {
                        tracing::info!("'{}' 的候选 '{}' 属于 {}", term, option, category);
                        return true;
                    }
                }
                tracing::info!("'{}' 的所有候选都不属于 {}", term, category);
                return false;
            }
            ResolveOutcome::Resolved(page) => {
                if self.classifier.classifies(&page.summary, category) {
                    return true;
                }
                Some(page.title)
            }
            ResolveOutcome::NotFound => None,
        };

        self.search_fallback(term, category, checked_title.as_deref())
            .await
    }

    /// 全文搜索兜底，逐个检查前几条结果
    async fn search_fallback(&self, term: &str, category: &str, skip_title: Option<&str>) -> bool {
        let titles = match self.source.search(term, self.search_fallback_results).await {
            Ok(titles) => titles,
            Err(e) => {
                tracing::warn!("搜索 '{}' 失败: {}", term, e);
                return false;
            }
        };

        for title in titles {
            if Some(title.as_str()) == skip_title {
                continue;
            }
            if self.classify_title(&title, category).await {
                tracing::info!("'{}' 通过搜索结果 '{}' 确认属于 {}", term, title, category);
                return true;
            }
        }
        false
    }

    /// 获取页面摘要并分类
    async fn classify_title(&self, title: &str, category: &str) -> bool {
        match self.source.page(title).await {
            Ok(PageLookup::Found(page)) => self.classifier.classifies(&page.summary, category),
            Ok(PageLookup::Disambiguation(_)) => {
                tracing::debug!("'{}' 是消歧义页，跳过", title);
                false
            }
            Ok(PageLookup::Missing) => {
                tracing::debug!("页面 '{}' 不存在", title);
                false
            }
            Err(e) => {
                tracing::warn!("查询页面 '{}' 失败: {}", title, e);
                false
            }
        }
    }
}
