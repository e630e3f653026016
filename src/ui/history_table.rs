//! 历史记录表格
//!
//! 纯文本渲染：列宽按内容计算，空词条显示为 "-"。

use crate::core::keywords::KeywordTable;
use crate::core::models::{GameRecord, VerifiedTermEntry, DATE_FORMAT};
use crate::core::review::ReviewSheet;
use crate::storage::game_log::LogStats;

fn display_width(s: &str) -> usize {
    s.chars().count()
}

fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(s));
    format!("{}{}", s, " ".repeat(fill))
}

/// 渲染记录表格，rows 为（下标, 记录）
pub fn render_records(title: &str, categories: &[String], rows: &[(usize, &GameRecord)]) -> String {
    let mut out = format!("== {} ==\n", title);
    if rows.is_empty() {
        out.push_str("（没有记录）\n");
        return out;
    }

    let mut header = vec!["#".to_string(), "Date".to_string(), "Letter".to_string()];
    header.extend(categories.iter().cloned());
    header.push("Points".to_string());

    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|(index, record)| {
            let mut cells = vec![
                index.to_string(),
                record.date.format(DATE_FORMAT).to_string(),
                record.letter.to_string(),
            ];
            cells.extend(categories.iter().map(|c| match record.term(c) {
                "" => "-".to_string(),
                term => term.to_string(),
            }));
            cells.push(record.points.to_string());
            cells
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            body.iter()
                .map(|row| display_width(&row[i]))
                .chain(std::iter::once(display_width(&header[i])))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render_row = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| pad(c, *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    out.push_str(&render_row(&header));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &body {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out
}

/// 渲染复核表
pub fn render_review(sheet: &ReviewSheet) -> String {
    let mut out = String::new();
    for (i, row) in sheet.rows().iter().enumerate() {
        let mark = if row.checked { "[x]" } else { "[ ]" };
        let term = if row.is_reviewable() {
            row.result.term.as_str()
        } else {
            "-"
        };
        let auto = if row.result.verified { "已验证" } else { "未验证" };
        out.push_str(&format!(
            "{:>2}. {} {:<10} {:<24} ({})\n",
            i + 1,
            mark,
            row.result.category,
            term,
            auto
        ));
    }
    out.push_str(&format!("当前得分: {}\n", sheet.current_points()));
    out
}

/// 渲染汇总统计
pub fn render_stats(stats: &LogStats) -> String {
    let mut out = String::from("== 统计 ==\n");
    out.push_str(&format!("局数: {}\n总分: {}\n", stats.games, stats.total_points));
    if let Some(ref best) = stats.best {
        out.push_str(&format!(
            "最佳: {} 分（字母 {}，{}）\n",
            best.points,
            best.letter,
            best.date.format(DATE_FORMAT)
        ));
    }

    if !stats.by_letter.is_empty() {
        out.push_str("\n每个字母的平均分:\n");
        for s in &stats.by_letter {
            out.push_str(&format!("  {}  {:>6.1}  ({} 局)\n", s.letter, s.average_points, s.games));
        }
    }

    if !stats.top_terms.is_empty() {
        out.push_str("\n最常用词条:\n");
        for (term, count) in &stats.top_terms {
            out.push_str(&format!("  {:<24} {}\n", term, count));
        }
    }
    out
}

/// 渲染类别规则
pub fn render_rules(table: &KeywordTable) -> String {
    let mut out = String::from("== 类别规则 ==\n");
    for rule in table.get_rules() {
        out.push_str(&format!("{}\n", rule.category));
        out.push_str(&format!("  单词: {}\n", rule.whole_words.join(", ")));
        out.push_str(&format!("  词尾: {}\n", rule.suffixes.join(", ")));
    }
    out
}

/// 渲染已验证词条，按类别分组
pub fn render_terms(entries: &[VerifiedTermEntry], category: Option<&str>) -> String {
    let mut grouped: std::collections::BTreeMap<&str, Vec<&str>> = std::collections::BTreeMap::new();
    for entry in entries {
        if category.map_or(true, |c| entry.category.eq_ignore_ascii_case(c)) {
            grouped
                .entry(entry.category.as_str())
                .or_default()
                .push(entry.term.as_str());
        }
    }

    let mut out = String::from("== 已验证词条 ==\n");
    if grouped.is_empty() {
        out.push_str("（缓存为空）\n");
        return out;
    }
    for (category, mut terms) in grouped {
        terms.sort_by_key(|t| t.to_lowercase());
        out.push_str(&format!("{} ({})\n  {}\n", category, terms.len(), terms.join(", ")));
    }
    out
}
