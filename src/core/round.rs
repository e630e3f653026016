//! 开局：随机字母与截止时间

use crate::core::models::{AppConfig, Round};
use rand::Rng;

/// 可抽取的字母
pub const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// 随机抽取一个字母
pub fn random_letter() -> char {
    random_letter_with(&mut rand::thread_rng())
}

/// 使用指定随机源抽取字母
pub fn random_letter_with<R: Rng + ?Sized>(rng: &mut R) -> char {
    ALPHABET[rng.gen_range(0..ALPHABET.len())] as char
}

/// 按配置开始新的一局
pub fn start_round(config: &AppConfig) -> Round {
    let letter = random_letter();
    tracing::info!("新的一局：字母 {}，限时 {} 秒", letter, config.time_limit_secs);
    Round::new(letter, config.categories.clone(), config.time_limit())
}
