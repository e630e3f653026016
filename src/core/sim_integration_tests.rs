use crate::core::game::GameSession;
use crate::core::models::{AppConfig, Round, Submission};
use crate::core::testing::StubSource;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

fn config_in(dir: &Path, categories: &[&str]) -> AppConfig {
    AppConfig {
        categories: categories.iter().map(|s| s.to_string()).collect(),
        data_dir: Some(dir.to_path_buf()),
        ..Default::default()
    }
}

fn rhine_source() -> StubSource {
    StubSource::new()
        .with_page("Rom", "Rom ist die Hauptstadt Italiens.")
        .with_page("Rhein", "Der Rhein ist ein Strom in Mitteleuropa.")
        .with_page("Rumänien", "Rumänien ist ein Staat in Südosteuropa.")
        .with_page("Rose", "Die Rosen sind eine Pflanzengattung.")
}

fn submission(categories: &[String], answers: &[(&str, &str)]) -> Submission {
    let mut submission = Submission::for_categories(categories);
    for (category, term) in answers {
        submission.set(category, *term);
    }
    submission
}

#[tokio::test]
async fn sim_full_round_persists_record_and_cache() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path(), &["City", "Country", "River", "Plant"]);
    let (mut session, _) = GameSession::open(config.clone(), Box::new(rhine_source()));

    let round = Round::new('R', config.categories.clone(), Duration::from_secs(60));
    let answers = submission(
        &config.categories,
        &[("City", "Rom"), ("Country", "Rumänien"), ("River", "Rhein"), ("Plant", "Rose")],
    );

    let sheet = session.check(&round, &answers).await;
    // "Pflanzengattung" 不以任何植物关键词结尾，自动验证失败
    assert_eq!(sheet.automatic_points(), 30);

    let record = session.finish(&round, sheet).unwrap();
    assert_eq!(record.points, 30);
    assert_eq!(record.letter, 'R');
    assert_eq!(record.term("Plant"), "");
    assert_eq!(session.log().records().len(), 1);
    assert!(session.cache().is_term_verified("rom", "City"));

    // 重新打开：记录和缓存都在，知识源失效时缓存依然生效
    let (mut reopened, report) =
        GameSession::open(config.clone(), Box::new(StubSource::new().failing()));
    assert!(!report.rewritten);
    assert_eq!(reopened.log().records()[0], record);

    let round = Round::new('R', config.categories.clone(), Duration::from_secs(60));
    let sheet = reopened
        .check(&round, &submission(&config.categories, &[("River", "RHEIN")]))
        .await;
    assert_eq!(sheet.automatic_points(), 10);
}

#[tokio::test]
async fn sim_review_overrides_score_and_cache() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path(), &["City", "River", "Plant"]);
    let (mut session, _) = GameSession::open(config.clone(), Box::new(rhine_source()));

    let round = Round::new('R', config.categories.clone(), Duration::from_secs(60));
    let answers = submission(
        &config.categories,
        &[("City", "Rom"), ("River", "Rhein"), ("Plant", "Rose")],
    );

    let mut sheet = session.check(&round, &answers).await;
    assert!(sheet.set_checked("City", false));
    assert!(sheet.set_checked("Plant", true));

    let record = session.finish(&round, sheet).unwrap();
    assert_eq!(record.points, 20);
    assert_eq!(record.term("City"), "");
    assert_eq!(record.term("Plant"), "Rose");

    assert!(!session.cache().is_term_verified("Rom", "City"));
    assert!(session.cache().is_term_verified("Rose", "Plant"));
    assert!(session.cache().is_term_verified("Rhein", "River"));
}

#[tokio::test]
async fn sim_zero_point_round_is_not_saved() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path(), &["City", "River"]);
    let (mut session, _) = GameSession::open(config.clone(), Box::new(rhine_source()));

    let round = Round::new('K', config.categories.clone(), Duration::from_secs(60));
    // 字母不对
    let answers = submission(&config.categories, &[("City", "Rom")]);

    let sheet = session.check(&round, &answers).await;
    assert_eq!(sheet.automatic_points(), 0);
    assert!(session.finish(&round, sheet).is_none());
    assert!(session.log().records().is_empty());
    assert!(!dir.path().join("game_results_by_round.csv").exists());
}

#[tokio::test]
async fn sim_category_removed_between_sessions() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path(), &["City", "River"]);
    let (mut session, _) = GameSession::open(config.clone(), Box::new(rhine_source()));

    let round = Round::new('R', config.categories.clone(), Duration::from_secs(60));
    let sheet = session
        .check(&round, &submission(&config.categories, &[("City", "Rom"), ("River", "Rhein")]))
        .await;
    assert_eq!(session.finish(&round, sheet).unwrap().points, 20);
    drop(session);

    let narrowed = config_in(dir.path(), &["City"]);
    let (session, report) = GameSession::open(narrowed, Box::new(StubSource::new()));
    assert_eq!(report.dropped_columns, vec!["River".to_string()]);
    assert_eq!(session.log().records()[0].points, 10);
}

#[tokio::test]
async fn sim_unreadable_data_files_do_not_stop_the_game() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path(), &["City", "River"]);
    config.rules_file = Some(dir.path().join("missing-rules.json"));
    // 历史记录路径被目录占用，无法读取
    std::fs::create_dir(dir.path().join("game_results_by_round.csv")).unwrap();

    let (mut session, report) = GameSession::open(config.clone(), Box::new(rhine_source()));
    assert_eq!(report, Default::default());
    assert!(session.keywords().get_rule("River").is_some());
    assert!(session.log().records().is_empty());

    let round = Round::new('R', config.categories.clone(), Duration::from_secs(60));
    let sheet = session
        .check(&round, &submission(&config.categories, &[("City", "Rom"), ("River", "Rhein")]))
        .await;
    assert_eq!(sheet.automatic_points(), 20);
    assert!(session.finish(&round, sheet).is_none());
    assert!(dir.path().join("game_results_by_round.csv").is_dir());
    assert!(session.cache().is_term_verified("Rom", "City"));
}
