//! 游戏历史记录
//!
//! 文件格式：`Date,Letter,<按字母排序的类别>,Points`，每局一行。
//! 启动时会按当前类别配置同步表头：删除已移除的类别列并扣除相应分数，
//! 为新增类别补空列，补齐缺失的日期与字母。

use crate::core::models::{GameRecord, DATE_FORMAT, POINTS_PER_TERM};
use crate::storage::verified_terms::ensure_parent;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

const DATE_COLUMN: &str = "Date";
const LETTER_COLUMN: &str = "Letter";
const POINTS_COLUMN: &str = "Points";

/// 无法推断字母时的占位
pub const UNKNOWN_LETTER: char = '?';

/// 排序字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Date,
    Letter,
    Points,
}

/// 启动同步报告
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// 补充了 Date 列
    pub added_date_column: bool,
    /// 推断了 Letter 列
    pub inferred_letter_column: bool,
    /// 补填今天日期的行数
    pub filled_dates: usize,
    /// 删除的过时类别列
    pub dropped_columns: Vec<String>,
    /// 因删除类别被扣分的行数
    pub adjusted_rows: usize,
    /// 新增的类别列
    pub added_columns: Vec<String>,
    /// 无法解析而跳过的行数
    pub skipped_rows: usize,
    /// 是否重写了文件
    pub rewritten: bool,
}

/// 按字母统计
#[derive(Debug, Clone, PartialEq)]
pub struct LetterStats {
    pub letter: char,
    pub games: usize,
    pub average_points: f64,
}

/// 历史汇总
#[derive(Debug, Clone, PartialEq)]
pub struct LogStats {
    pub games: usize,
    pub total_points: u64,
    pub best: Option<GameRecord>,
    pub by_letter: Vec<LetterStats>,
    /// 最常用的词条（词条, 次数）
    pub top_terms: Vec<(String, usize)>,
}

/// 原始表格
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    skipped: usize,
}

impl RawTable {
    fn read(path: &Path) -> Result<Option<Self>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("打开历史记录失败: {}", path.display()))?;

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Ok(None);
        }

        let mut rows = Vec::new();
        let mut skipped = 0;
        for record in reader.records() {
            match record {
                Ok(record) => {
                    let mut row: Vec<String> = record.iter().map(str::to_string).collect();
                    row.resize(headers.len(), String::new());
                    rows.push(row);
                }
                Err(e) => {
                    tracing::warn!("跳过无法解析的历史记录行: {}", e);
                    skipped += 1;
                }
            }
        }

        Ok(Some(Self {
            headers,
            rows,
            skipped,
        }))
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// 游戏历史记录
pub struct GameLog {
    path: PathBuf,
    categories: Vec<String>,
    records: Vec<GameRecord>,
    writable: bool,
}

impl GameLog {
    /// 默认文件名
    pub const FILE_NAME: &'static str = "game_results_by_round.csv";

    /// 打开历史记录并按当前类别同步
    pub fn open(path: impl Into<PathBuf>, categories: &[String]) -> Result<(Self, SyncReport)> {
        let today = Local::now().date_naive();
        Self::open_with_date(path, categories, today)
    }

    /// 指定"今天"的日期打开（补填缺失日期用）
    pub fn open_with_date(
        path: impl Into<PathBuf>,
        categories: &[String],
        today: NaiveDate,
    ) -> Result<(Self, SyncReport)> {
        let mut log = Self::in_memory(path.into(), categories, true);

        if !log.path.exists() {
            tracing::info!("历史记录文件不存在，无需同步");
            return Ok((log, SyncReport::default()));
        }

        let table = match RawTable::read(&log.path)? {
            Some(t) => t,
            None => return Ok((log, SyncReport::default())),
        };

        let configured = configured_order(categories);
        let (records, mut report) = synchronize(&table, &configured, today);
        log.records = records;

        let expected = log.header();
        let changed = report.added_date_column
            || report.inferred_letter_column
            || report.filled_dates > 0
            || !report.dropped_columns.is_empty()
            || !report.added_columns.is_empty()
            || table.headers != expected;

        if changed {
            match log.flush() {
                Ok(()) => {
                    report.rewritten = true;
                    tracing::info!("历史记录已按当前类别配置同步");
                }
                Err(e) => tracing::warn!("同步后的历史记录写回失败，本次只在内存中使用: {:#}", e),
            }
        }

        Ok((log, report))
    }

    /// 无法读取历史文件时使用的空记录，不会写入文件
    pub fn unavailable(path: impl Into<PathBuf>, categories: &[String]) -> Self {
        Self::in_memory(path.into(), categories, false)
    }

    fn in_memory(path: PathBuf, categories: &[String], writable: bool) -> Self {
        let mut sorted = categories.to_vec();
        sorted.sort();
        sorted.dedup();

        Self {
            path,
            categories: sorted,
            records: Vec::new(),
            writable,
        }
    }

    /// 文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 当前类别（已排序）
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// 所有记录（按保存顺序）
    pub fn records(&self) -> &[GameRecord] {
        &self.records
    }

    /// 追加一局记录
    pub fn append(&mut self, record: GameRecord) -> Result<()> {
        let record = self.normalize(record);
        self.records.push(record);
        if let Err(e) = self.flush() {
            self.records.pop();
            return Err(e);
        }
        tracing::info!("已保存第 {} 局记录到 {}", self.records.len(), self.path.display());
        Ok(())
    }

    /// 最近 n 局
    pub fn last(&self, n: usize) -> &[GameRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }

    /// 按字母筛选（忽略大小写），返回（下标, 记录）
    pub fn by_letter(&self, letter: char) -> Vec<(usize, &GameRecord)> {
        let wanted = letter.to_ascii_uppercase();
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.letter.to_ascii_uppercase() == wanted)
            .collect()
    }

    /// 排序后的记录，返回（下标, 记录）
    pub fn sorted(&self, key: SortKey, ascending: bool) -> Vec<(usize, &GameRecord)> {
        let mut rows: Vec<_> = self.records.iter().enumerate().collect();
        rows.sort_by(|(_, a), (_, b)| {
            let ord = match key {
                SortKey::Date => a.date.cmp(&b.date),
                SortKey::Letter => a.letter.cmp(&b.letter),
                SortKey::Points => a.points.cmp(&b.points),
            };
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        });
        rows
    }

    /// 删除一局记录
    pub fn delete(&mut self, index: usize) -> Result<GameRecord> {
        if index >= self.records.len() {
            anyhow::bail!("记录 {} 不存在，共 {} 条", index, self.records.len());
        }
        let removed = self.records.remove(index);
        if let Err(e) = self.flush() {
            self.records.insert(index, removed);
            return Err(e);
        }
        tracing::info!("已删除记录 {} ({} / {} 分)", index, removed.letter, removed.points);
        Ok(removed)
    }

    /// 汇总统计
    pub fn stats(&self) -> LogStats {
        let games = self.records.len();
        let total_points = self.records.iter().map(|r| r.points as u64).sum();
        let best = self.records.iter().max_by_key(|r| r.points).cloned();

        let mut per_letter: BTreeMap<char, (usize, u64)> = BTreeMap::new();
        for r in &self.records {
            let entry = per_letter.entry(r.letter).or_default();
            entry.0 += 1;
            entry.1 += r.points as u64;
        }
        let by_letter = per_letter
            .into_iter()
            .map(|(letter, (games, points))| LetterStats {
                letter,
                games,
                average_points: points as f64 / games as f64,
            })
            .collect();

        let mut term_counts: HashMap<String, (String, usize)> = HashMap::new();
        for term in self.records.iter().flat_map(|r| r.terms.values()) {
            let term = term.trim();
            if term.is_empty() {
                continue;
            }
            term_counts
                .entry(term.to_lowercase())
                .or_insert_with(|| (term.to_string(), 0))
                .1 += 1;
        }
        let mut top_terms: Vec<(String, usize)> = term_counts.into_values().collect();
        top_terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_terms.truncate(10);

        LogStats {
            games,
            total_points,
            best,
            by_letter,
            top_terms,
        }
    }

    /// 表头：Date, Letter, 类别..., Points
    fn header(&self) -> Vec<String> {
        let mut header = vec![DATE_COLUMN.to_string(), LETTER_COLUMN.to_string()];
        header.extend(self.categories.iter().cloned());
        header.push(POINTS_COLUMN.to_string());
        header
    }

    /// 只保留当前配置的类别
    fn normalize(&self, mut record: GameRecord) -> GameRecord {
        let mut terms = BTreeMap::new();
        for category in &self.categories {
            let term = record.terms.remove(category).unwrap_or_default();
            terms.insert(category.clone(), term.trim().to_string());
        }
        for (category, term) in record.terms {
            if !term.trim().is_empty() {
                tracing::warn!("类别 '{}' 未启用，词条 '{}' 不会保存", category, term);
            }
        }
        record.terms = terms;
        record.letter = record.letter.to_ascii_uppercase();
        record
    }

    /// 整体写回文件
    fn flush(&self) -> Result<()> {
        if !self.writable {
            anyhow::bail!("历史记录文件 {} 无法读取，不写入以免覆盖", self.path.display());
        }
        ensure_parent(&self.path)?;
        let mut writer = csv::Writer::from_path(&self.path)
            .with_context(|| format!("写入历史记录失败: {}", self.path.display()))?;

        writer.write_record(self.header())?;
        for record in &self.records {
            let mut row = vec![
                record.date.format(DATE_FORMAT).to_string(),
                record.letter.to_string(),
            ];
            row.extend(self.categories.iter().map(|c| record.term(c).to_string()));
            row.push(record.points.to_string());
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// 去重并保持配置中的类别顺序
fn configured_order(categories: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    categories
        .iter()
        .filter(|c| seen.insert(c.as_str()))
        .cloned()
        .collect()
}

/// 把原始表格转换为当前配置下的记录
/// categories 按配置顺序，推断缺失字母时按此顺序取第一个词条
fn synchronize(table: &RawTable, categories: &[String], today: NaiveDate) -> (Vec<GameRecord>, SyncReport) {
    let mut report = SyncReport {
        skipped_rows: table.skipped,
        ..SyncReport::default()
    };

    let date_col = table.column(DATE_COLUMN);
    let letter_col = table.column(LETTER_COLUMN);
    let points_col = table.column(POINTS_COLUMN);

    if date_col.is_none() {
        tracing::info!("历史记录缺少 Date 列，已补充");
        report.added_date_column = true;
    }
    if letter_col.is_none() {
        tracing::info!("历史记录缺少 Letter 列，将根据词条推断");
        report.inferred_letter_column = true;
    }

    let category_cols: Vec<(&String, Option<usize>)> =
        categories.iter().map(|c| (c, table.column(c))).collect();

    report.added_columns = category_cols
        .iter()
        .filter(|(_, col)| col.is_none())
        .map(|(c, _)| (*c).clone())
        .collect();

    let obsolete: Vec<(usize, &String)> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| {
            !h.is_empty()
                && h.as_str() != DATE_COLUMN
                && h.as_str() != LETTER_COLUMN
                && h.as_str() != POINTS_COLUMN
                && !categories.contains(*h)
        })
        .collect();
    report.dropped_columns = obsolete.iter().map(|(_, h)| (*h).clone()).collect();

    let mut records = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let cell = |col: Option<usize>| col.map(|i| row[i].trim()).unwrap_or("");

        let date = match cell(date_col) {
            "" => {
                report.filled_dates += 1;
                today
            }
            raw => match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
                Ok(d) => d,
                Err(_) => {
                    tracing::warn!("无法解析日期 '{}'，使用今天", raw);
                    report.filled_dates += 1;
                    today
                }
            },
        };

        let mut points = parse_points(cell(points_col));
        let mut adjusted = false;
        for (col, name) in &obsolete {
            if !row[*col].trim().is_empty() {
                points = points.saturating_sub(POINTS_PER_TERM);
                adjusted = true;
                tracing::debug!("删除类别 '{}' 的词条 '{}'，扣除 {} 分", name, row[*col].trim(), POINTS_PER_TERM);
            }
        }
        if adjusted {
            report.adjusted_rows += 1;
        }

        let terms: BTreeMap<String, String> = category_cols
            .iter()
            .map(|(c, col)| ((*c).clone(), cell(*col).to_string()))
            .collect();

        let letter = cell(letter_col)
            .chars()
            .next()
            .or_else(|| {
                categories
                    .iter()
                    .filter_map(|c| terms.get(c))
                    .find_map(|t| t.chars().next())
            })
            .map(|c| c.to_uppercase().next().unwrap_or(c))
            .unwrap_or(UNKNOWN_LETTER);

        records.push(GameRecord {
            date,
            letter,
            terms,
            points,
        });
    }

    if !report.dropped_columns.is_empty() {
        tracing::info!(
            "已删除过时类别 {:?}，调整了 {} 行的分数",
            report.dropped_columns,
            report.adjusted_rows
        );
    }
    if report.filled_dates > 0 {
        tracing::info!("{} 行缺少日期，已填入今天", report.filled_dates);
    }

    (records, report)
}

/// 解析分数，兼容 "20.0" 这样的写法
fn parse_points(raw: &str) -> u32 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0;
    }
    raw.parse::<u32>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|p| *p >= 0.0).map(|p| p.round() as u32))
        .unwrap_or_else(|| {
            tracing::warn!("无法解析分数 '{}'，按 0 处理", raw);
            0
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn categories(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(letter: char, terms: &[(&str, &str)], day: u32) -> GameRecord {
        let terms = terms
            .iter()
            .map(|(c, t)| (c.to_string(), t.to_string()))
            .collect();
        GameRecord::new(date(2024, 6, day), letter, terms)
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("games.csv");
        let cats = categories(&["River", "City", "Country"]);

        let (mut log, _) = GameLog::open(&path, &cats).unwrap();
        log.append(record('r', &[("City", "Rom"), ("River", "Rhein")], 15)).unwrap();

        let (reloaded, report) = GameLog::open(&path, &cats).unwrap();
        assert!(!report.rewritten);
        assert_eq!(reloaded.records().len(), 1);

        let loaded = &reloaded.records()[0];
        assert_eq!(loaded, &log.records()[0]);
        assert_eq!(loaded.letter, 'R');
        assert_eq!(loaded.term("City"), "Rom");
        assert_eq!(loaded.term("River"), "Rhein");
        assert_eq!(loaded.term("Country"), "");
        assert_eq!(loaded.points, 20);
        assert_eq!(loaded.date, date(2024, 6, 15));

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Date,Letter,City,Country,River,Points\n"));
        assert!(content.contains("15-06-2024,R,Rom,,Rhein,20"));
    }

    #[test]
    fn test_removed_category_deducts_points_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("games.csv");
        std::fs::write(
            &path,
            "Date,Letter,Brand,City,Points\n\
             01-06-2024,B,BMW,Berlin,20\n\
             02-06-2024,K,,Köln,10\n",
        )
        .unwrap();

        let cats = categories(&["City"]);
        let (log, report) = GameLog::open(&path, &cats).unwrap();
        assert_eq!(report.dropped_columns, vec!["Brand".to_string()]);
        assert_eq!(report.adjusted_rows, 1);
        assert!(report.rewritten);
        assert_eq!(log.records()[0].points, 10);
        assert_eq!(log.records()[1].points, 10);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Date,Letter,City,Points\n"));
        assert!(!content.contains("BMW"));

        // 再次打开不会重复扣分
        let (log, report) = GameLog::open(&path, &cats).unwrap();
        assert!(!report.rewritten);
        assert_eq!(log.records()[0].points, 10);
    }

    #[test]
    fn test_each_removed_category_deducts_independently() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("games.csv");
        std::fs::write(
            &path,
            "Date,Letter,Brand,City,Food,Points\n01-06-2024,B,BMW,Berlin,Brot,30\n",
        )
        .unwrap();

        let (log, report) = GameLog::open(&path, &categories(&["City"])).unwrap();
        assert_eq!(report.dropped_columns.len(), 2);
        assert_eq!(report.adjusted_rows, 1);
        assert_eq!(log.records()[0].points, 10);
    }

    #[test]
    fn test_legacy_file_is_migrated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("games.csv");
        std::fs::write(&path, "City,River,Points\nMünchen,,10\n,Elbe,10.0\n").unwrap();

        let today = date(2024, 7, 1);
        let cats = categories(&["City", "River", "Animal"]);
        let (log, report) = GameLog::open_with_date(&path, &cats, today).unwrap();

        assert!(report.added_date_column);
        assert!(report.inferred_letter_column);
        assert_eq!(report.filled_dates, 2);
        assert_eq!(report.added_columns, vec!["Animal".to_string()]);
        assert!(report.rewritten);

        let letters: Vec<char> = log.records().iter().map(|r| r.letter).collect();
        assert_eq!(letters, vec!['M', 'E']);
        assert!(log.records().iter().all(|r| r.date == today));
        assert_eq!(log.records()[1].points, 10);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Date,Letter,Animal,City,River,Points\n"));
        assert!(content.contains("01-07-2024,M,,München,,10"));
    }

    #[test]
    fn test_missing_letter_follows_configured_category_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("games.csv");
        std::fs::write(&path, "Date,City,River,Points\n01-06-2024,Köln,Rhein,20\n").unwrap();

        let (log, report) = GameLog::open(&path, &categories(&["River", "City"])).unwrap();
        assert!(report.inferred_letter_column);
        assert_eq!(log.records()[0].letter, 'R');
    }

    #[test]
    fn test_corrupt_row_is_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("games.csv");
        let mut content = b"Date,Letter,City,Points\n01-06-2024,B,Berlin,10\n".to_vec();
        content.extend_from_slice(b"02-06-2024,K,K\xff\xfeln,10\n");
        content.extend_from_slice(b"03-06-2024,M,M\xc3\xbcnchen,10\n");
        std::fs::write(&path, &content).unwrap();

        let (log, report) = GameLog::open(&path, &categories(&["City"])).unwrap();
        assert_eq!(report.skipped_rows, 1);
        assert!(!report.rewritten);

        let cities: Vec<&str> = log.records().iter().map(|r| r.term("City")).collect();
        assert_eq!(cities, vec!["Berlin", "München"]);
    }

    #[test]
    fn test_unavailable_log_never_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("games.csv");
        std::fs::write(&path, "keep me").unwrap();

        let mut log = GameLog::unavailable(&path, &categories(&["City"]));
        assert!(log.append(record('B', &[("City", "Bonn")], 1)).is_err());
        assert!(log.records().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
    }

    #[test]
    fn test_queries_and_delete() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("games.csv");
        let cats = categories(&["City", "River"]);
        let (mut log, _) = GameLog::open(&path, &cats).unwrap();

        log.append(record('B', &[("City", "Bonn")], 3)).unwrap();
        log.append(record('R', &[("City", "Rom"), ("River", "Rhein")], 1)).unwrap();
        log.append(record('b', &[("City", "Bern"), ("River", "Bode")], 2)).unwrap();

        assert_eq!(log.last(2).len(), 2);
        assert_eq!(log.last(2)[0].letter, 'R');
        assert_eq!(log.last(10).len(), 3);

        let b_games: Vec<usize> = log.by_letter('b').iter().map(|(i, _)| *i).collect();
        assert_eq!(b_games, vec![0, 2]);

        let by_date: Vec<usize> = log.sorted(SortKey::Date, true).iter().map(|(i, _)| *i).collect();
        assert_eq!(by_date, vec![1, 2, 0]);

        let by_points: Vec<u32> = log
            .sorted(SortKey::Points, false)
            .iter()
            .map(|(_, r)| r.points)
            .collect();
        assert_eq!(by_points, vec![20, 20, 10]);

        let removed = log.delete(0).unwrap();
        assert_eq!(removed.term("City"), "Bonn");
        assert!(log.delete(5).is_err());

        let (reloaded, _) = GameLog::open(&path, &cats).unwrap();
        assert_eq!(reloaded.records().len(), 2);
        assert_eq!(reloaded.records()[0].term("City"), "Rom");
    }

    #[test]
    fn test_stats() {
        let dir = tempdir().unwrap();
        let cats = categories(&["City", "River"]);
        let (mut log, _) = GameLog::open(dir.path().join("games.csv"), &cats).unwrap();

        log.append(record('R', &[("City", "Rom"), ("River", "Rhein")], 1)).unwrap();
        log.append(record('R', &[("City", "rom")], 2)).unwrap();
        log.append(record('B', &[("City", "Bonn")], 3)).unwrap();

        let stats = log.stats();
        assert_eq!(stats.games, 3);
        assert_eq!(stats.total_points, 40);
        assert_eq!(stats.best.unwrap().points, 20);

        let r = stats.by_letter.iter().find(|s| s.letter == 'R').unwrap();
        assert_eq!(r.games, 2);
        assert!((r.average_points - 15.0).abs() < f64::EPSILON);

        assert_eq!(stats.top_terms[0], ("Rom".to_string(), 2));
    }

    #[test]
    fn test_unconfigured_terms_are_not_saved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("games.csv");
        let (mut log, _) = GameLog::open(&path, &categories(&["City"])).unwrap();
        log.append(record('B', &[("City", "Bonn"), ("Brand", "BMW")], 1)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("BMW"));
        assert_eq!(log.records()[0].terms.len(), 1);
    }
}
