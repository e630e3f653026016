//! 已验证词条缓存
//!
//! 记录已确认属于某类别的词条，避免重复查询维基百科。
//! 文件格式：`Term,Category`。新增时追加一行，删除时整体重写。

use crate::core::models::VerifiedTermEntry;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

const HEADER: [&str; 2] = ["Term", "Category"];

/// 已验证词条存储
pub struct VerifiedTermStore {
    path: PathBuf,
    entries: Vec<VerifiedTermEntry>,
    index: HashSet<(String, String)>,
    writable: bool,
}

impl VerifiedTermStore {
    /// 默认文件名
    pub const FILE_NAME: &'static str = "verified_terms.csv";

    /// 打开缓存文件，不存在时为空
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self::in_memory(path.into(), true);

        if store.path.exists() {
            let mut reader = csv::Reader::from_path(&store.path)
                .with_context(|| format!("打开词条缓存失败: {}", store.path.display()))?;
            for row in reader.deserialize::<VerifiedTermEntry>() {
                match row {
                    Ok(entry) => {
                        if store.index.insert(entry.key()) {
                            store.entries.push(entry);
                        }
                    }
                    Err(e) => tracing::warn!("跳过无法解析的缓存行: {}", e),
                }
            }
            tracing::info!("已加载 {} 条已验证词条", store.entries.len());
        }

        Ok(store)
    }

    /// 无法读取缓存文件时使用：只在内存中记录，不写入文件
    pub fn unavailable(path: impl Into<PathBuf>) -> Self {
        Self::in_memory(path.into(), false)
    }

    fn in_memory(path: PathBuf, writable: bool) -> Self {
        Self {
            path,
            entries: Vec::new(),
            index: HashSet::new(),
            writable,
        }
    }

    /// 缓存文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 所有缓存项
    pub fn entries(&self) -> &[VerifiedTermEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 词条是否已验证（词条忽略大小写）
    pub fn is_term_verified(&self, term: &str, category: &str) -> bool {
        self.index
            .contains(&VerifiedTermEntry::new(term, category).key())
    }

    /// 添加已验证词条，已存在时返回 false
    pub fn add_verified_term(&mut self, term: &str, category: &str) -> Result<bool> {
        let entry = VerifiedTermEntry::new(term, category);
        if entry.term.is_empty() || !self.index.insert(entry.key()) {
            return Ok(false);
        }

        self.entries.push(entry.clone());
        self.append(&entry)?;
        tracing::debug!("缓存新增: '{}' -> {}", entry.term, entry.category);
        Ok(true)
    }

    /// 删除已验证词条，不存在时返回 false
    pub fn remove_verified_term(&mut self, term: &str, category: &str) -> Result<bool> {
        let key = VerifiedTermEntry::new(term, category).key();
        if !self.index.remove(&key) {
            return Ok(false);
        }

        self.entries.retain(|e| e.key() != key);
        self.rewrite()?;
        tracing::debug!("缓存删除: '{}' -> {}", term, category);
        Ok(true)
    }

    /// 追加一行
    fn append(&self, entry: &VerifiedTermEntry) -> Result<()> {
        self.ensure_writable()?;
        ensure_parent(&self.path)?;
        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("写入词条缓存失败: {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(HEADER)?;
        }
        writer.write_record([entry.term.as_str(), entry.category.as_str()])?;
        writer.flush()?;
        Ok(())
    }

    /// 整体重写
    fn rewrite(&self) -> Result<()> {
        self.ensure_writable()?;
        ensure_parent(&self.path)?;
        let mut writer = csv::Writer::from_path(&self.path)
            .with_context(|| format!("重写词条缓存失败: {}", self.path.display()))?;
        writer.write_record(HEADER)?;
        for entry in &self.entries {
            writer.write_record([entry.term.as_str(), entry.category.as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl VerifiedTermStore {
    fn ensure_writable(&self) -> Result<()> {
        if !self.writable {
            anyhow::bail!("词条缓存 {} 无法读取，不写入以免覆盖", self.path.display());
        }
        Ok(())
    }
}

pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
