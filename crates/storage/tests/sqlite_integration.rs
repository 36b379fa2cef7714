use chrono::Duration;
use clavier_core::model::{AnswerCounts, Choice, GameSession, PlayerId, Role, SessionId};
use clavier_core::time::fixed_now;
use storage::repository::{
    AnswerLogRepository, GamePersistence, GameSessionRepository, NewAnswerLog, NewPlayerRecord,
    NewSessionRecord, PlayerRepository, QuestionRepository, StorageError,
};
use storage::seed::{CATALOG, ensure_seeded};
use storage::sqlite::SqliteRepository;

async fn repo(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn player(repo: &SqliteRepository, name: &str, role: Role) -> PlayerId {
    repo.insert_player(NewPlayerRecord {
        name: name.into(),
        role,
        created_at: fixed_now(),
    })
    .await
    .unwrap()
}

async fn session(repo: &SqliteRepository, player_id: PlayerId, minutes: i64) -> SessionId {
    repo.insert_session(NewSessionRecord {
        player_id,
        started_at: fixed_now() + Duration::minutes(minutes),
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = repo("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    assert!(!repo.has_questions().await.unwrap());
}

#[tokio::test]
async fn interrupted_seeding_leaves_no_partial_catalog() {
    let repo = repo("memdb_seed_abort").await;
    sqlx::query(
        r"
        CREATE TRIGGER cap_questions BEFORE INSERT ON questions
        WHEN (SELECT COUNT(*) FROM questions) >= 3
        BEGIN
            SELECT RAISE(ABORT, 'disk full');
        END;
        ",
    )
    .execute(repo.pool())
    .await
    .unwrap();

    assert!(ensure_seeded(&repo).await.is_err());
    assert!(!repo.has_questions().await.unwrap());

    sqlx::query("DROP TRIGGER cap_questions")
        .execute(repo.pool())
        .await
        .unwrap();
    assert_eq!(ensure_seeded(&repo).await.unwrap(), CATALOG.len());
    assert_eq!(repo.list_questions().await.unwrap().len(), CATALOG.len());
}

#[tokio::test]
async fn players_are_unique_by_name_and_role_updates() {
    let repo = repo("memdb_players").await;
    let id = player(&repo, "Alice", Role::Front).await;

    let err = repo
        .insert_player(NewPlayerRecord {
            name: "Alice".into(),
            role: Role::Back,
            created_at: fixed_now(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    repo.update_player_role(id, Role::Mobile).await.unwrap();
    let alice = repo.find_player_by_name("Alice").await.unwrap().unwrap();
    assert_eq!(alice.id(), id);
    assert_eq!(alice.role(), Role::Mobile);
    assert_eq!(alice.created_at(), fixed_now());

    assert!(repo.find_player_by_name("Bob").await.unwrap().is_none());
    assert!(matches!(
        repo.update_player_role(PlayerId::new(999), Role::Back)
            .await
            .unwrap_err(),
        StorageError::NotFound
    ));
}

#[tokio::test]
async fn session_for_unknown_player_is_not_found() {
    let repo = repo("memdb_orphan_session").await;
    let err = repo
        .insert_session(NewSessionRecord {
            player_id: PlayerId::new(42),
            started_at: fixed_now(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn answers_and_session_commit_together() {
    let repo = repo("memdb_answers").await;
    assert_eq!(ensure_seeded(&repo).await.unwrap(), CATALOG.len());
    let question = repo.list_questions().await.unwrap().remove(0);

    let pid = player(&repo, "Alice", Role::Back).await;
    let sid = session(&repo, pid, 0).await;

    let mut game = repo.get_session(sid).await.unwrap().unwrap();
    assert_eq!(game, GameSession::start(sid, pid, fixed_now()));

    let wrong = Choice::ALL
        .into_iter()
        .find(|c| *c != question.correct_choice())
        .unwrap();
    for (offset, selected) in [(0, question.correct_choice()), (1, wrong)] {
        let is_correct = question.is_correct(selected);
        game.apply_answer(is_correct);
        repo.record_answer(
            &game,
            NewAnswerLog {
                session_id: sid,
                question_id: question.id(),
                selected,
                is_correct,
                answered_at: fixed_now() + Duration::seconds(offset),
            },
        )
        .await
        .unwrap();
    }

    let stored = repo.get_session(sid).await.unwrap().unwrap();
    assert_eq!(stored.stage(), 2);
    assert_eq!(stored.score(), 10);
    assert_eq!(stored.streak(), 0);

    assert_eq!(
        repo.answer_counts(sid).await.unwrap(),
        AnswerCounts {
            total: 2,
            correct: 1
        }
    );
    let last = repo.last_log(sid).await.unwrap().unwrap();
    assert!(!last.is_correct);
    assert_eq!(last.selected, wrong);
    assert_eq!(repo.logs_for_session(sid).await.unwrap().len(), 2);
}

#[tokio::test]
async fn failed_log_insert_rolls_back_session_update() {
    let repo = repo("memdb_rollback").await;
    let pid = player(&repo, "Alice", Role::Front).await;
    let sid = session(&repo, pid, 0).await;

    let mut game = repo.get_session(sid).await.unwrap().unwrap();
    game.apply_answer(true);
    let err = repo
        .record_answer(
            &game,
            NewAnswerLog {
                session_id: sid,
                question_id: clavier_core::model::QuestionId::new(12345),
                selected: Choice::A,
                is_correct: true,
                answered_at: fixed_now(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let stored = repo.get_session(sid).await.unwrap().unwrap();
    assert_eq!(stored.stage(), 1);
    assert_eq!(stored.score(), 0);
}

#[tokio::test]
async fn perk_flags_round_trip() {
    let repo = repo("memdb_perks").await;
    let pid = player(&repo, "Alice", Role::Mobile).await;
    let sid = session(&repo, pid, 0).await;

    let mut game = repo.get_session(sid).await.unwrap().unwrap();
    game.mark_perk_used(clavier_core::model::Perk::Hint);
    repo.update_session(&game).await.unwrap();

    let stored = repo.get_session(sid).await.unwrap().unwrap();
    assert!(stored.perks().mobile);
    assert!(!stored.perks().front);
    assert!(!stored.perks().back);
}

#[tokio::test]
async fn scores_are_ranked_with_deterministic_ties() {
    let repo = repo("memdb_scores").await;
    let alice = player(&repo, "Alice", Role::Front).await;
    let bob = player(&repo, "Bob", Role::Back).await;

    let a1 = session(&repo, alice, 0).await;
    let b1 = session(&repo, bob, 1).await;
    let b2 = session(&repo, bob, 2).await;

    for (sid, correct) in [(a1, 4), (b1, 2), (b2, 2)] {
        let mut game = repo.get_session(sid).await.unwrap().unwrap();
        for _ in 0..correct {
            game.apply_answer(true);
        }
        repo.update_session(&game).await.unwrap();
    }

    let scores = repo.list_scores().await.unwrap();
    let order: Vec<_> = scores
        .iter()
        .map(|row| (row.player_name.as_str(), row.score, row.session_id))
        .collect();
    assert_eq!(order, vec![("Alice", 50, a1), ("Bob", 20, b1), ("Bob", 20, b2)]);
}

#[tokio::test]
async fn history_is_most_recent_first_and_delete_cascades() {
    let repo = repo("memdb_history").await;
    let alice = player(&repo, "Alice", Role::Front).await;
    let first = session(&repo, alice, 0).await;
    let second = session(&repo, alice, 5).await;

    let history: Vec<_> = repo
        .sessions_for_player(alice)
        .await
        .unwrap()
        .iter()
        .map(GameSession::id)
        .collect();
    assert_eq!(history, vec![second, first]);
    assert_eq!(
        repo.latest_session_for_player(alice)
            .await
            .unwrap()
            .unwrap()
            .id(),
        second
    );

    repo.delete_player(alice).await.unwrap();
    assert!(repo.get_session(first).await.unwrap().is_none());
    assert!(repo.list_scores().await.unwrap().is_empty());
}
