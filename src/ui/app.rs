//! 主应用程序
//!
//! 把游戏会话接到终端：交互菜单，或直接执行一条子命令。

use crate::core::game::GameSession;
use crate::storage::config::ConfigManager;
use crate::storage::game_log::SortKey;
use crate::ui::args::Command;
use crate::ui::console::Console;
use crate::ui::history_table::{render_records, render_rules, render_stats, render_terms};
use anyhow::Result;

/// 主应用程序
pub struct StadtLandFlussApp {
    session: GameSession,
    config_manager: ConfigManager,
    console: Console,
}

impl StadtLandFlussApp {
    /// 创建新的应用实例
    pub fn new(session: GameSession, config_manager: ConfigManager) -> Self {
        Self {
            session,
            config_manager,
            console: Console::stdin(),
        }
    }

    /// 执行子命令，没有子命令时进入菜单
    pub async fn run(&mut self, cmd: Option<Command>) -> Result<()> {
        match cmd {
            Some(cmd) => self.execute(cmd).await,
            None => self.run_menu().await,
        }
    }

    async fn execute(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::Play => self.play_round().await,
            Command::History { last } => {
                self.show_history(last);
                Ok(())
            }
            Command::Search { letter } => {
                self.search_by_letter(letter);
                Ok(())
            }
            Command::All { sort, asc } => {
                self.show_all(sort.into(), asc);
                Ok(())
            }
            Command::Delete { index } => {
                self.delete(index);
                Ok(())
            }
            Command::Stats => {
                println!("{}", render_stats(&self.session.log().stats()));
                Ok(())
            }
            Command::Rules { json } => {
                if json {
                    println!("{}", self.session.keywords().export_to_json()?);
                } else {
                    println!("{}", render_rules(self.session.keywords()));
                }
                Ok(())
            }
            Command::Terms { category } => {
                self.show_terms(category.as_deref());
                Ok(())
            }
            Command::Forget { term, category } => {
                self.forget(&term, &category);
                Ok(())
            }
            Command::Config { reset } => self.show_config(reset),
        }
    }

    /// 主菜单
    async fn run_menu(&mut self) -> Result<()> {
        loop {
            println!("\n== Stadt, Land, Fluss ==");
            println!("1) 开始游戏");
            println!("2) 最近 {} 局", self.session.config().history_games_to_show);
            println!("3) 按字母查找");
            println!("4) 所有记录");
            println!("5) 删除记录");
            println!("6) 统计");
            println!("7) 已验证词条");
            println!("8) 类别规则");
            println!("q) 退出");

            let choice = match self.console.read_line("> ").await? {
                Some(line) => line.trim().to_lowercase(),
                None => return Ok(()),
            };

            match choice.as_str() {
                "1" => self.play_round().await?,
                "2" => self.show_history(None),
                "3" => {
                    if let Some(line) = self.console.read_line("字母: ").await? {
                        match line.trim().chars().next() {
                            Some(letter) => self.search_by_letter(letter),
                            None => println!("请输入一个字母"),
                        }
                    }
                }
                "4" => self.show_all(SortKey::Date, false),
                "5" => {
                    if let Some(line) = self.console.read_line("记录编号: ").await? {
                        match line.trim().parse::<usize>() {
                            Ok(index) => self.delete(index),
                            Err(_) => println!("无效的编号: {}", line.trim()),
                        }
                    }
                }
                "6" => println!("{}", render_stats(&self.session.log().stats())),
                "7" => self.show_terms(None),
                "8" => println!("{}", render_rules(self.session.keywords())),
                "q" | "quit" | "exit" => return Ok(()),
                "" => {}
                other => println!("未知选项: {}", other),
            }
        }
    }

    /// 玩一局：输入 -> 自动验证 -> 复核 -> 保存
    async fn play_round(&mut self) -> Result<()> {
        let round = self.session.start_round();
        println!("类别: {}", round.categories.join(", "));

        let submission = self.console.collect_answers(&round).await?;
        println!("\n正在验证 {} 个答案...", submission.filled_count());

        let mut sheet = self.session.check(&round, &submission).await;
        println!("自动验证得分: {}", sheet.automatic_points());

        self.console.review(&mut sheet).await?;

        match self.session.finish(&round, sheet) {
            Some(record) => println!("本局得分 {}，已保存", record.points),
            None => println!("本局没有保存"),
        }
        Ok(())
    }

    fn show_history(&self, last: Option<usize>) {
        let log = self.session.log();
        let n = last.unwrap_or(self.session.config().history_games_to_show);
        let offset = log.records().len().saturating_sub(n);
        let rows: Vec<_> = log
            .last(n)
            .iter()
            .enumerate()
            .map(|(i, r)| (offset + i, r))
            .collect();
        println!("{}", render_records(&format!("最近 {} 局", n), log.categories(), &rows));
    }

    fn search_by_letter(&self, letter: char) {
        let log = self.session.log();
        let letter = letter.to_ascii_uppercase();
        let rows = log.by_letter(letter);
        println!(
            "{}",
            render_records(&format!("字母 '{}' 的记录", letter), log.categories(), &rows)
        );
    }

    fn show_all(&self, key: SortKey, ascending: bool) {
        let log = self.session.log();
        let rows = log.sorted(key, ascending);
        println!("{}", render_records("所有记录", log.categories(), &rows));
    }

    fn delete(&mut self, index: usize) {
        match self.session.log_mut().delete(index) {
            Ok(record) => println!(
                "已删除记录 {}（字母 {}，{} 分）",
                index, record.letter, record.points
            ),
            Err(e) => {
                tracing::error!("删除记录失败: {:#}", e);
                println!("删除失败: {}", e);
            }
        }
    }

    fn show_terms(&self, category: Option<&str>) {
        let cache = self.session.cache();
        println!("{}", render_terms(cache.entries(), category));
        if !cache.is_empty() {
            println!("共 {} 条", cache.len());
        }
    }

    fn forget(&mut self, term: &str, category: &str) {
        match self.session.cache_mut().remove_verified_term(term, category) {
            Ok(true) => println!("已从缓存移除 '{}'（{}）", term, category),
            Ok(false) => println!("缓存中没有 '{}'（{}）", term, category),
            Err(e) => {
                tracing::error!("移除缓存词条失败: {:#}", e);
                println!("移除失败: {}", e);
            }
        }
    }

    fn show_config(&self, reset: bool) -> Result<()> {
        if reset {
            self.config_manager.reset()?;
            println!("已恢复默认配置，下次启动生效");
        }
        println!("配置文件: {}", self.config_manager.path().display());
        println!("历史记录: {}", self.session.log().path().display());
        println!("词条缓存: {}", self.session.cache().path().display());
        println!("{}", serde_json::to_string_pretty(&self.config_manager.load()?)?);
        Ok(())
    }
}
