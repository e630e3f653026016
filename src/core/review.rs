//! 人工复核
//!
//! 自动验证结果交给玩家逐项勾选确认，人类拥有最终裁决权。
//! 复核结果会修正已验证词条缓存，并决定最终得分。

use crate::core::models::{GameRecord, ValidationResult, POINTS_PER_TERM};
use crate::storage::verified_terms::VerifiedTermStore;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// 复核表中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRow {
    pub result: ValidationResult,
    /// 玩家是否认可
    pub checked: bool,
}

impl ReviewRow {
    /// 是否可以勾选（空答案不能得分）
    pub fn is_reviewable(&self) -> bool {
        !self.result.term.trim().is_empty()
    }
}

/// 复核表
#[derive(Debug, Clone, Default)]
pub struct ReviewSheet {
    rows: Vec<ReviewRow>,
}

/// 复核后的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    /// 类别 -> 认可的词条（未认可为空）
    pub terms: BTreeMap<String, String>,
    /// 最终得分
    pub points: u32,
    /// 新增到缓存的词条数（漏判修正）
    pub added: usize,
    /// 从缓存删除的词条数（误判修正）
    pub removed: usize,
}

impl ReviewOutcome {
    /// 生成持久化记录
    pub fn to_record(&self, date: NaiveDate, letter: char) -> GameRecord {
        GameRecord {
            date,
            letter,
            terms: self.terms.clone(),
            points: self.points,
        }
    }
}

impl ReviewSheet {
    /// 以自动验证结果为初始勾选状态
    pub fn new(results: Vec<ValidationResult>) -> Self {
        let rows = results
            .into_iter()
            .map(|result| ReviewRow {
                checked: result.verified,
                result,
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[ReviewRow] {
        &self.rows
    }

    /// 复核前的自动得分
    pub fn automatic_points(&self) -> u32 {
        self.rows.iter().filter(|r| r.result.verified).count() as u32 * POINTS_PER_TERM
    }

    /// 当前勾选状态下的得分
    pub fn current_points(&self) -> u32 {
        self.rows.iter().filter(|r| r.checked).count() as u32 * POINTS_PER_TERM
    }

    /// 设置某类别的勾选状态，类别不存在或答案为空时返回 false
    pub fn set_checked(&mut self, category: &str, checked: bool) -> bool {
        match self
            .rows
            .iter_mut()
            .find(|r| r.result.category == category && r.is_reviewable())
        {
            Some(row) => {
                row.checked = checked;
                true
            }
            None => false,
        }
    }

    /// 切换某类别的勾选状态
    pub fn toggle(&mut self, category: &str) -> bool {
        let current = self
            .rows
            .iter()
            .find(|r| r.result.category == category)
            .map(|r| r.checked);
        match current {
            Some(checked) => self.set_checked(category, !checked),
            None => false,
        }
    }

    /// 应用复核结果：修正缓存并计算最终得分
    pub fn reconcile(self, cache: &mut VerifiedTermStore) -> ReviewOutcome {
        let mut terms = BTreeMap::new();
        let mut added = 0;
        let mut removed = 0;
        let mut accepted = 0u32;

        for row in self.rows {
            let ValidationResult {
                term,
                category,
                verified,
            } = row.result;

            match (verified, row.checked) {
                (true, false) => match cache.remove_verified_term(&term, &category) {
                    Ok(true) => {
                        tracing::info!("复核撤销: '{}' 不属于 {}", term, category);
                        removed += 1;
                    }
                    Ok(false) => {}
                    Err(e) => tracing::error!("从缓存删除 '{}' 失败: {}", term, e),
                },
                (false, true) => match cache.add_verified_term(&term, &category) {
                    Ok(true) => {
                        tracing::info!("复核确认: '{}' 属于 {}", term, category);
                        added += 1;
                    }
                    Ok(false) => {}
                    Err(e) => tracing::error!("写入缓存 '{}' 失败: {}", term, e),
                },
                _ => {}
            }

            if row.checked {
                accepted += 1;
                terms.insert(category, term);
            } else {
                terms.insert(category, String::new());
            }
        }

        ReviewOutcome {
            terms,
            points: accepted * POINTS_PER_TERM,
            added,
            removed,
        }
    }
}
