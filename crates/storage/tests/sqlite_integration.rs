use lms_core::model::{
    AnswerRecord, AnswerSet, CandidateId, LearningId, LearningKey, LearningType, QuestionId,
    ScoreRecord, ScoreStatus,
};
use storage::repository::{QuestionBankRepository, QuestionRow, ScoreRepository, UpsertOutcome};
use storage::sqlite::SqliteRepository;

fn training() -> LearningKey {
    LearningKey::new(LearningType::Training, LearningId::new("TR-100").unwrap())
}

fn row(id: u64, key: &LearningKey, phase: &str) -> QuestionRow {
    QuestionRow {
        id,
        learning_type: key.learning_type,
        learning_id: key.learning_id.clone(),
        prompt: Some(format!("Question {id}")),
        options: [Some("A".into()), Some("B".into()), None, Some("D".into())],
        answer: Some("A:D".into()),
        question_type: Some("Multiple".into()),
        phase_duration: Some(phase.into()),
    }
}

async fn repo(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_questions_roundtrip_per_learning_item() {
    let repo = repo("memdb_questions").await;
    let key = training();
    let policy = LearningKey::new(LearningType::Policy, LearningId::new("TR-100").unwrap());

    repo.upsert_question(&row(2, &key, "00:01:00")).await.unwrap();
    repo.upsert_question(&row(1, &key, "00:00:30")).await.unwrap();
    repo.upsert_question(&row(1, &policy, "00:00:00")).await.unwrap();

    let mut updated = row(2, &key, "00:02:00");
    updated.options[2] = Some("C".into());
    repo.upsert_question(&updated).await.unwrap();

    let rows = repo.fetch_questions(&key).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], row(1, &key, "00:00:30"));
    assert_eq!(rows[1], updated);
}

#[tokio::test]
async fn sqlite_score_upsert_keeps_one_row_per_natural_key() {
    let repo = repo("memdb_scores").await;
    let key = training().for_candidate(CandidateId::new(77));

    assert!(repo.fetch_score(&key).await.unwrap().is_none());

    let first: AnswerSet = vec![
        AnswerRecord::new(QuestionId::new(1), "A,D"),
        AnswerRecord::new(QuestionId::new(2), "B"),
    ]
    .into();
    let record = ScoreRecord::new(key.clone(), 1, ScoreStatus::Pass, first);
    assert_eq!(repo.upsert_score(&record).await.unwrap(), UpsertOutcome::Inserted);

    let mut second = record.answers.clone();
    second.insert(AnswerRecord::new(QuestionId::new(3), "A"));
    let record = ScoreRecord::new(key.clone(), 1, ScoreStatus::Fail, second);
    assert_eq!(repo.upsert_score(&record).await.unwrap(), UpsertOutcome::Updated);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM learning_scores")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);

    let fetched = repo.fetch_score(&key).await.unwrap().unwrap();
    assert_eq!(fetched, record);
}

#[tokio::test]
async fn sqlite_scores_are_isolated_by_candidate_and_type() {
    let repo = repo("memdb_score_keys").await;
    let mine = training().for_candidate(CandidateId::new(1));
    let theirs = training().for_candidate(CandidateId::new(2));
    let policy = LearningKey::new(LearningType::Policy, LearningId::new("TR-100").unwrap())
        .for_candidate(CandidateId::new(1));

    let record = ScoreRecord::new(mine.clone(), 0, ScoreStatus::Fail, AnswerSet::new());
    repo.upsert_score(&record).await.unwrap();

    assert!(repo.fetch_score(&mine).await.unwrap().is_some());
    assert!(repo.fetch_score(&theirs).await.unwrap().is_none());
    assert!(repo.fetch_score(&policy).await.unwrap().is_none());
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = repo("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
}
