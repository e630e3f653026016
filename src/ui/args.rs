//! 命令行参数

use crate::storage::game_log::SortKey;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "stadtlandfluss",
    version,
    about = "Stadt, Land, Fluss - 用维基百科验证答案的文字游戏"
)]
pub struct Cli {
    /// 配置文件路径
    #[arg(long, global = true, env = "STADTLANDFLUSS_CONFIG")]
    pub config: Option<PathBuf>,

    /// 不带子命令时进入交互菜单
    #[command(subcommand)]
    pub cmd: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 玩一局
    Play,
    /// 最近几局
    History {
        /// 显示条数（默认取配置）
        #[arg(long)]
        last: Option<usize>,
    },
    /// 按字母查找
    Search {
        letter: char,
    },
    /// 所有记录
    All {
        #[arg(long, value_enum, default_value_t = SortArg::Date)]
        sort: SortArg,
        /// 升序（默认降序）
        #[arg(long)]
        asc: bool,
    },
    /// 删除一条记录
    Delete {
        index: usize,
    },
    /// 汇总统计
    Stats,
    /// 当前类别规则
    Rules {
        /// 以JSON输出（可直接作为规则文件）
        #[arg(long)]
        json: bool,
    },
    /// 已验证词条缓存
    Terms {
        /// 只显示该类别
        #[arg(long)]
        category: Option<String>,
    },
    /// 从缓存中移除一个词条
    Forget {
        term: String,
        category: String,
    },
    /// 显示配置
    Config {
        /// 恢复默认配置
        #[arg(long)]
        reset: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortArg {
    Date,
    Letter,
    Points,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Date => SortKey::Date,
            SortArg::Letter => SortKey::Letter,
            SortArg::Points => SortKey::Points,
        }
    }
}
