//! 终端输入
//!
//! 倒计时只在输入阶段生效：到时立即提交已输入的内容，不再等待剩余类别。

use crate::core::models::{Round, Submission};
use crate::core::review::ReviewSheet;
use crate::ui::history_table::render_review;
use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::time::Instant;

/// 带截止时间的输入结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimedInput {
    Line(String),
    TimedOut,
    Closed,
}

/// 终端
pub struct Console<R = BufReader<Stdin>> {
    lines: Lines<R>,
}

impl Console {
    /// 读取标准输入
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> Console<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    fn show_prompt(prompt: &str) {
        print!("{}", prompt);
        let _ = std::io::stdout().flush();
    }

    /// 读取一行，输入结束时返回 None
    pub async fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        Self::show_prompt(prompt);
        Ok(self.lines.next_line().await?)
    }

    /// 在截止时间前读取一行
    pub async fn read_line_until(&mut self, prompt: &str, deadline: Instant) -> Result<TimedInput> {
        Self::show_prompt(prompt);
        match tokio::time::timeout_at(deadline, self.lines.next_line()).await {
            Ok(Ok(Some(line))) => Ok(TimedInput::Line(line)),
            Ok(Ok(None)) => Ok(TimedInput::Closed),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Ok(TimedInput::TimedOut),
        }
    }

    /// 逐个类别收集答案，超时后提交已输入的部分
    pub async fn collect_answers(&mut self, round: &Round) -> Result<Submission> {
        let deadline = Instant::from_std(round.deadline);
        let mut submission = Submission::for_categories(&round.categories);

        println!(
            "\n字母: {}    时间: {} 秒",
            round.letter,
            round.remaining().as_secs()
        );

        for category in &round.categories {
            if round.is_expired() {
                println!("\n时间到！");
                break;
            }
            let prompt = format!("[{:>3}s] {}: ", round.remaining().as_secs(), category);
            match self.read_line_until(&prompt, deadline).await? {
                TimedInput::Line(term) => {
                    let term = term.trim();
                    if !term.is_empty() && !round.accepts_initial(term) {
                        println!("  提示: '{}' 不是以 {} 开头，不会得分", term, round.letter);
                    }
                    submission.set(category, term);
                }
                TimedInput::TimedOut => {
                    tracing::info!("倒计时结束，提交 {} 个答案", submission.filled_count());
                    self.discard_pending_line().await?;
                    break;
                }
                TimedInput::Closed => break,
            }
        }

        Ok(submission)
    }

    /// 超时后读掉输入到一半的那一行，不让它进入复核
    async fn discard_pending_line(&mut self) -> Result<()> {
        if let Some(line) = self.read_line("\n时间到！按回车继续").await? {
            if !line.trim().is_empty() {
                tracing::debug!("丢弃超时后的输入: '{}'", line.trim());
            }
        }
        Ok(())
    }

    /// 逐项复核：输入编号切换勾选，空行确认
    pub async fn review(&mut self, sheet: &mut ReviewSheet) -> Result<()> {
        loop {
            println!("\n{}", render_review(sheet));
            let line = match self.read_line("输入编号切换勾选，直接回车确认: ").await? {
                Some(line) => line,
                None => return Ok(()),
            };

            let line = line.trim();
            if line.is_empty() {
                return Ok(());
            }

            let category = line
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| sheet.rows().get(i))
                .map(|row| row.result.category.clone());

            match category {
                Some(category) => {
                    if !sheet.toggle(&category) {
                        println!("类别 {} 没有答案，不能勾选", category);
                    }
                }
                None => println!("无效的编号: {}", line),
            }
        }
    }
}
