//! UI模块 - 终端界面

pub mod app;
pub mod args;
pub mod console;
pub mod history_table;
