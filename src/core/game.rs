//! 游戏会话
//!
//! 持有知识源、规则表、词条缓存与历史记录，串起一局的完整流程：
//! 开局 -> 自动验证 -> 人工复核 -> 保存。

use crate::core::classifier::CategoryClassifier;
use crate::core::keywords::KeywordTable;
use crate::core::lookup::KnowledgeSource;
use crate::core::models::{AppConfig, GameRecord, Round, Submission};
use crate::core::review::ReviewSheet;
use crate::core::round::start_round;
use crate::core::validator::Validator;
use crate::storage::config::ConfigManager;
use crate::storage::game_log::{GameLog, SyncReport};
use crate::storage::verified_terms::VerifiedTermStore;

/// 游戏会话
pub struct GameSession {
    config: AppConfig,
    source: Box<dyn KnowledgeSource>,
    keywords: KeywordTable,
    classifier: CategoryClassifier,
    cache: VerifiedTermStore,
    log: GameLog,
}

impl GameSession {
    /// 按配置打开数据文件并创建会话
    /// 规则文件或数据文件读取失败只记录日志，游戏照常进行
    pub fn open(config: AppConfig, source: Box<dyn KnowledgeSource>) -> (Self, SyncReport) {
        let mut keywords = KeywordTable::new();
        if let Some(ref rules_file) = config.rules_file {
            match keywords.load_from_file(rules_file) {
                Ok(count) => tracing::info!("已从 {} 加载 {} 条类别规则", rules_file.display(), count),
                Err(e) => tracing::warn!("加载规则文件失败，使用内置规则: {:#}", e),
            }
        }

        let data_dir = ConfigManager::data_dir(&config);

        let cache_path = data_dir.join(VerifiedTermStore::FILE_NAME);
        let cache = VerifiedTermStore::open(&cache_path).unwrap_or_else(|e| {
            tracing::error!("读取词条缓存失败，本次只在内存中缓存: {:#}", e);
            VerifiedTermStore::unavailable(&cache_path)
        });

        let log_path = data_dir.join(GameLog::FILE_NAME);
        let (log, report) = GameLog::open(&log_path, &config.categories).unwrap_or_else(|e| {
            tracing::error!("读取历史记录失败，本次不保存成绩: {:#}", e);
            (
                GameLog::unavailable(&log_path, &config.categories),
                SyncReport::default(),
            )
        });

        (Self::with_parts(config, source, keywords, cache, log), report)
    }

    /// 由已构建的组件创建会话
    pub fn with_parts(
        config: AppConfig,
        source: Box<dyn KnowledgeSource>,
        keywords: KeywordTable,
        cache: VerifiedTermStore,
        log: GameLog,
    ) -> Self {
        for category in &config.categories {
            if keywords.get_rule(category).is_none() {
                tracing::warn!("类别 '{}' 没有关键词规则，该类别的词条只能通过缓存或人工确认", category);
            }
        }

        let classifier = CategoryClassifier::new(&keywords);
        Self {
            config,
            source,
            keywords,
            classifier,
            cache,
            log,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    pub fn cache(&self) -> &VerifiedTermStore {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut VerifiedTermStore {
        &mut self.cache
    }

    pub fn log(&self) -> &GameLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut GameLog {
        &mut self.log
    }

    /// 开始新的一局
    pub fn start_round(&self) -> Round {
        start_round(&self.config)
    }

    /// 自动验证一份提交，返回待复核的结果表
    pub async fn check(&mut self, round: &Round, submission: &Submission) -> ReviewSheet {
        let validator = Validator::new(self.source.as_ref(), &self.classifier, &self.config.lookup);
        let results = validator
            .validate_submission(&mut self.cache, round, submission)
            .await;

        let sheet = ReviewSheet::new(results);
        tracing::debug!("第一轮自动得分: {}", sheet.automatic_points());
        sheet
    }

    /// 应用复核结果并保存，返回保存的记录
    /// 0 分的一局不保存；保存失败只记录日志
    pub fn finish(&mut self, round: &Round, sheet: ReviewSheet) -> Option<GameRecord> {
        let outcome = sheet.reconcile(&mut self.cache);
        if outcome.added > 0 || outcome.removed > 0 {
            tracing::info!("复核修正缓存: 新增 {} 条，删除 {} 条", outcome.added, outcome.removed);
        }
        let record = outcome.to_record(round.started_at.date_naive(), round.letter);

        if record.points == 0 {
            tracing::info!("本局 0 分，不保存");
            return None;
        }

        match self.log.append(record.clone()) {
            Ok(()) => {
                tracing::info!("本局 {} 分已保存", record.points);
                Some(record)
            }
            Err(e) => {
                tracing::error!("保存本局结果失败: {:#}", e);
                None
            }
        }
    }
}
