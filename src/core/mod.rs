//! Core模块 - 包含所有核心业务逻辑

pub mod models;
pub mod keywords;
pub mod classifier;
pub mod lookup;
pub mod resolver;
pub mod validator;
pub mod review;
pub mod round;
pub mod game;

#[cfg(test)]
pub mod testing;

#[cfg(test)]
mod sim_integration_tests;
