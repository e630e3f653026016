//! 测试用的内存知识源

use crate::core::lookup::{KnowledgeSource, LookupError, LookupResult, Page, PageLookup};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct StubSource {
    pages: HashMap<String, PageLookup>,
    suggestions: HashMap<String, String>,
    searches: HashMap<String, Vec<String>>,
    failing: bool,
    page_calls: AtomicUsize,
    suggest_calls: AtomicUsize,
    search_calls: AtomicUsize,
    requested_pages: Mutex<Vec<String>>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, title: &str, summary: &str) -> Self {
        self.pages.insert(
            title.to_string(),
            PageLookup::Found(Page {
                title: title.to_string(),
                summary: summary.to_string(),
            }),
        );
        self
    }

    pub fn with_disambiguation(mut self, title: &str, options: &[&str]) -> Self {
        self.pages.insert(
            title.to_string(),
            PageLookup::Disambiguation(options.iter().map(|s| s.to_string()).collect()),
        );
        self
    }

    pub fn with_suggestion(mut self, term: &str, suggestion: &str) -> Self {
        self.suggestions.insert(term.to_string(), suggestion.to_string());
        self
    }

    pub fn with_search(mut self, query: &str, titles: &[&str]) -> Self {
        self.searches
            .insert(query.to_string(), titles.iter().map(|s| s.to_string()).collect());
        self
    }

    /// 所有请求都返回错误
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn suggest_calls(&self) -> usize {
        self.suggest_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// 按请求顺序记录的页面标题
    pub fn requested_pages(&self) -> Vec<String> {
        self.requested_pages
            .lock()
            .map(|titles| titles.clone())
            .unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.page_calls() + self.suggest_calls() + self.search_calls()
    }

    fn check_failing(&self) -> LookupResult<()> {
        if self.failing {
            Err(LookupError::UnexpectedResponse("stub failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KnowledgeSource for StubSource {
    async fn page(&self, title: &str) -> LookupResult<PageLookup> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut titles) = self.requested_pages.lock() {
            titles.push(title.to_string());
        }
        self.check_failing()?;
        Ok(self.pages.get(title).cloned().unwrap_or(PageLookup::Missing))
    }

    async fn suggest(&self, term: &str) -> LookupResult<Option<String>> {
        self.suggest_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        Ok(self.suggestions.get(term).cloned())
    }

    async fn search(&self, query: &str, limit: usize) -> LookupResult<Vec<String>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        Ok(self
            .searches
            .get(query)
            .map(|hits| hits.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
