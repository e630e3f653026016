//! 外部知识源
//!
//! 定义知识源接口，以及基于 MediaWiki Action API 的维基百科实现。
//! 接口只暴露三种页面结果：找到、歧义、不存在。

use crate::core::models::LookupConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;

/// 知识源错误
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("网络请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API返回错误 {code}: {info}")]
    Api { code: String, info: String },

    #[error("无法解析的响应: {0}")]
    UnexpectedResponse(String),
}

pub type LookupResult<T> = Result<T, LookupError>;

/// 页面及其摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub summary: String,
}

/// 精确标题查询的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLookup {
    /// 找到页面
    Found(Page),
    /// 消歧义页，附带候选标题
    Disambiguation(Vec<String>),
    /// 页面不存在
    Missing,
}

/// 知识源接口
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// 精确标题查询
    async fn page(&self, title: &str) -> LookupResult<PageLookup>;

    /// 拼写纠正建议
    async fn suggest(&self, term: &str) -> LookupResult<Option<String>>;

    /// 全文搜索，按相关度返回标题
    async fn search(&self, query: &str, limit: usize) -> LookupResult<Vec<String>>;
}

/// 维基百科客户端
pub struct WikipediaClient {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    query: Option<QueryBody>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Default, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: Vec<PageBody>,
    #[serde(default)]
    search: Vec<SearchHit>,
    #[serde(default)]
    searchinfo: Option<SearchInfo>,
}

#[derive(Debug, Deserialize)]
struct PageBody {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    pageprops: Option<PageProps>,
    #[serde(default)]
    links: Vec<LinkBody>,
    #[serde(default)]
    revisions: Vec<RevisionBody>,
}

#[derive(Debug, Deserialize)]
struct RevisionBody {
    #[serde(default)]
    slots: Option<RevisionSlots>,
}

#[derive(Debug, Deserialize)]
struct RevisionSlots {
    #[serde(default)]
    main: Option<SlotBody>,
}

#[derive(Debug, Deserialize)]
struct SlotBody {
    #[serde(default)]
    content: Option<String>,
}

/// 不是条目的命名空间前缀
const NON_ARTICLE_PREFIXES: &[&str] = &[
    "datei", "file", "bild", "image", "kategorie", "category", "vorlage", "template",
    "wikipedia", "hilfe", "help", "portal", "spezial", "special",
];

/// 从消歧义页源码的列表项中按出现顺序取出链接目标，每项只取第一个链接
fn list_item_targets(wikitext: &str) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    for line in wikitext.lines() {
        let line = line.trim_start();
        if !line.starts_with('*') {
            continue;
        }
        let Some(start) = line.find("[[") else {
            continue;
        };
        let rest = &line[start + 2..];
        let Some(end) = rest.find("]]") else {
            continue;
        };

        let target = rest[..end]
            .split(['|', '#'])
            .next()
            .unwrap_or("")
            .trim()
            .replace('_', " ");
        if target.is_empty() || target.starts_with(':') {
            continue;
        }
        if let Some((prefix, _)) = target.split_once(':') {
            if NON_ARTICLE_PREFIXES.contains(&prefix.trim().to_lowercase().as_str()) {
                continue;
            }
        }

        // 标题首字母总是大写
        let mut chars = target.chars();
        let title: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => continue,
        };
        if !targets.contains(&title) {
            targets.push(title);
        }
    }
    targets
}

#[derive(Debug, Deserialize)]
struct PageProps {
    #[serde(default)]
    disambiguation: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct LinkBody {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SearchInfo {
    #[serde(default)]
    suggestion: Option<String>,
}

impl WikipediaClient {
    /// 创建新的客户端
    pub fn new(config: &LookupConfig) -> LookupResult<Self> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&config.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("stadtlandfluss"));
        headers.insert(USER_AGENT, agent);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.api_endpoint.trim().to_string(),
        })
    }

    /// 调用 API
    async fn query(&self, params: &[(&str, &str)]) -> LookupResult<QueryBody> {
        let mut all_params = vec![("action", "query"), ("format", "json"), ("formatversion", "2")];
        all_params.extend_from_slice(params);

        let response: ApiResponse = self
            .client
            .get(&self.endpoint)
            .query(&all_params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(LookupError::Api {
                code: err.code,
                info: err.info,
            });
        }

        Ok(response.query.unwrap_or_default())
    }

    /// 获取消歧义页列出的候选标题（按页面中的顺序）
    async fn disambiguation_options(&self, title: &str) -> LookupResult<Vec<String>> {
        let body = self
            .query(&[
                ("prop", "revisions"),
                ("rvprop", "content"),
                ("rvslots", "main"),
                ("titles", title),
            ])
            .await?;

        let wikitext = body
            .pages
            .into_iter()
            .next()
            .and_then(|p| p.revisions.into_iter().next())
            .and_then(|r| r.slots)
            .and_then(|s| s.main)
            .and_then(|m| m.content)
            .unwrap_or_default();

        let options = list_item_targets(&wikitext);
        if !options.is_empty() {
            return Ok(options);
        }

        // 源码中没有列表项时退回页面链接（按标题排序）
        tracing::debug!("消歧义页 '{}' 没有列表项，改用页面链接", title);
        let body = self
            .query(&[
                ("prop", "links"),
                ("plnamespace", "0"),
                ("pllimit", "max"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .await?;

        let page = body
            .pages
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::UnexpectedResponse(format!("'{}' 没有返回页面", title)))?;

        Ok(page.links.into_iter().map(|l| l.title).collect())
    }
}

#[async_trait]
impl KnowledgeSource for WikipediaClient {
    async fn page(&self, title: &str) -> LookupResult<PageLookup> {
        let body = self
            .query(&[
                ("prop", "extracts|pageprops"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("ppprop", "disambiguation"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .await?;

        let page = match body.pages.into_iter().next() {
            Some(p) => p,
            None => return Ok(PageLookup::Missing),
        };

        if page.missing || page.invalid {
            return Ok(PageLookup::Missing);
        }

        let is_disambiguation = page
            .pageprops
            .as_ref()
            .map(|p| p.disambiguation.is_some())
            .unwrap_or(false);

        if is_disambiguation {
            let options = self.disambiguation_options(&page.title).await?;
            return Ok(PageLookup::Disambiguation(options));
        }

        Ok(PageLookup::Found(Page {
            title: page.title,
            summary: page.extract.unwrap_or_default(),
        }))
    }

    async fn suggest(&self, term: &str) -> LookupResult<Option<String>> {
        let body = self
            .query(&[
                ("list", "search"),
                ("srsearch", term),
                ("srinfo", "suggestion"),
                ("srprop", ""),
                ("srlimit", "1"),
            ])
            .await?;

        Ok(body
            .searchinfo
            .and_then(|s| s.suggestion)
            .filter(|s| !s.trim().is_empty()))
    }

    async fn search(&self, query: &str, limit: usize) -> LookupResult<Vec<String>> {
        let limit = limit.max(1).to_string();
        let body = self
            .query(&[
                ("list", "search"),
                ("srsearch", query),
                ("srprop", ""),
                ("srlimit", &limit),
            ])
            .await?;

        Ok(body.search.into_iter().map(|h| h.title).collect())
    }
}
