//! 页面解析器
//!
//! 把玩家输入的词条解析为知识源中的页面。
//! 按顺序尝试各解析策略，第一个成功即返回。

use crate::core::lookup::{KnowledgeSource, Page, PageLookup};

/// 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// 解析到唯一页面
    Resolved(Page),
    /// 词条有歧义，附带候选标题（已截断）
    Ambiguous(Vec<String>),
    /// 无法解析
    NotFound,
}

/// 解析策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStrategy {
    /// 精确标题
    ExactTitle,
    /// 拼写纠正后的标题
    Suggestion,
    /// 全文搜索第一条结果的标题
    TopSearchHit,
}

impl ResolveStrategy {
    /// 此策略遇到消歧义页时是否直接返回歧义结果
    pub fn propagates_ambiguity(&self) -> bool {
        matches!(self, ResolveStrategy::ExactTitle)
    }

    /// 执行策略，返回 None 表示此策略无可查询的标题
    pub async fn attempt<S: KnowledgeSource + ?Sized>(
        &self,
        source: &S,
        term: &str,
    ) -> Option<PageLookup> {
        let title = match self {
            ResolveStrategy::ExactTitle => Some(term.to_string()),
            ResolveStrategy::Suggestion => match source.suggest(term).await {
                Ok(suggestion) => suggestion.filter(|s| s != term),
                Err(e) => {
                    tracing::warn!("获取 '{}' 的拼写建议失败: {}", term, e);
                    None
                }
            },
            ResolveStrategy::TopSearchHit => match source.search(term, 1).await {
                Ok(hits) => hits.into_iter().next(),
                Err(e) => {
                    tracing::warn!("搜索 '{}' 失败: {}", term, e);
                    None
                }
            },
        }?;

        match source.page(&title).await {
            Ok(lookup) => Some(lookup),
            Err(e) => {
                tracing::warn!("查询页面 '{}' 失败: {}", title, e);
                Some(PageLookup::Missing)
            }
        }
    }
}

/// 页面解析器
pub struct PageResolver {
    strategies: Vec<ResolveStrategy>,
    max_options: usize,
}

impl PageResolver {
    /// 创建解析器（精确 -> 拼写纠正 -> 搜索）
    pub fn new(max_options: usize) -> Self {
        Self {
            strategies: vec![
                ResolveStrategy::ExactTitle,
                ResolveStrategy::Suggestion,
                ResolveStrategy::TopSearchHit,
            ],
            max_options,
        }
    }

    /// 使用自定义策略顺序
    pub fn with_strategies(mut self, strategies: Vec<ResolveStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// 当前策略顺序
    pub fn strategies(&self) -> &[ResolveStrategy] {
        &self.strategies
    }

    /// 解析词条
    pub async fn resolve<S: KnowledgeSource + ?Sized>(&self, source: &S, term: &str) -> ResolveOutcome {
        let term = term.trim();
        if term.is_empty() {
            return ResolveOutcome::NotFound;
        }

        for strategy in &self.strategies {
            match strategy.attempt(source, term).await {
                Some(PageLookup::Found(page)) => {
                    tracing::debug!("'{}' 通过 {:?} 解析为 '{}'", term, strategy, page.title);
                    return ResolveOutcome::Resolved(page);
                }
                Some(PageLookup::Disambiguation(mut options)) if strategy.propagates_ambiguity() => {
                    options.truncate(self.max_options);
                    tracing::info!("'{}' 有歧义，候选: {:?}", term, options);
                    return ResolveOutcome::Ambiguous(options);
                }
                Some(PageLookup::Disambiguation(_)) => {
                    tracing::debug!("'{}' 在 {:?} 中命中消歧义页，继续", term, strategy);
                }
                Some(PageLookup::Missing) | None => {
                    tracing::debug!("'{}' 在 {:?} 中未找到", term, strategy);
                }
            }
        }

        tracing::info!("未找到 '{}' 的页面", term);
        ResolveOutcome::NotFound
    }
}
