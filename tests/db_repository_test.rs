//! Tests for database repository operations.

use diesel::Connection;
use diesel::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tempfile::NamedTempFile;

use dropfour::db::{DbErrorKind, REPLAY_MIGRATIONS, run_migrations};
use dropfour::{
    GameRepository, GameResult, MoveLogStore, Mover, Placement, RecordedMove, ReplayRepository,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/server");

/// Creates a temporary database file with schema applied, returns the file
/// handle (must stay in scope to keep the file alive) and a ready repository.
fn setup_test_db() -> (NamedTempFile, GameRepository) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let mut conn = SqliteConnection::establish(&db_path).expect("Failed to connect");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Migrations failed");

    let repo = GameRepository::new(db_path).expect("Failed to create repository");
    (db_file, repo)
}

fn setup_replay_db() -> (NamedTempFile, ReplayRepository) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();
    run_migrations(&db_path, REPLAY_MIGRATIONS).expect("Migrations failed");
    let repo = ReplayRepository::new(db_path).expect("Failed to create repository");
    (db_file, repo)
}

fn recorded(turn_number: u32, column: usize, row: usize, mover: Mover) -> RecordedMove {
    RecordedMove {
        placement: Placement::new(column, row, mover),
        turn_number,
    }
}

// Games

#[test]
fn test_create_game_starts_in_progress() {
    let (_db, repo) = setup_test_db();
    let game = repo.create_game(7).expect("Create failed");
    assert!(*game.id() > 0);
    assert_eq!(*game.owner_identifier(), 7);
    assert_eq!(game.parse_result().unwrap(), GameResult::InProgress);
    assert!(game.ended_at().is_none());
}

#[test]
fn test_non_positive_owner_violates_check() {
    let (_db, repo) = setup_test_db();
    let err = repo.create_game(0).unwrap_err();
    assert!(err.is_constraint_violation(), "got {:?}", err.kind);
}

#[test]
fn test_find_game_not_found() {
    let (_db, repo) = setup_test_db();
    assert!(repo.find_game(999).expect("Query failed").is_none());
}

#[test]
fn test_games_for_owner_newest_first() {
    let (_db, repo) = setup_test_db();
    let first = repo.create_game(3).expect("Create failed");
    let second = repo.create_game(3).expect("Create failed");
    repo.create_game(4).expect("Create failed");

    let games = repo.games_for_owner(3).expect("List failed");
    let ids: Vec<i32> = games.iter().map(|g| *g.id()).collect();
    assert_eq!(ids, vec![*second.id(), *first.id()]);
}

#[test]
fn test_append_moves_in_turn_order() {
    let (_db, repo) = setup_test_db();
    let game = repo.create_game(1).expect("Create failed");
    let id = *game.id();

    repo.append_moves(
        id,
        &[recorded(1, 3, 5, Mover::Player), recorded(2, 3, 4, Mover::Opponent)],
        GameResult::InProgress,
    )
    .expect("Append failed");
    repo.append_moves(id, &[recorded(3, 2, 5, Mover::Player)], GameResult::InProgress)
        .expect("Append failed");

    let moves = repo.load_moves(id).expect("Load failed");
    let turns: Vec<u32> = moves.iter().map(|m| m.turn_number).collect();
    assert_eq!(turns, vec![1, 2, 3]);
    assert_eq!(moves[1].placement, Placement::new(3, 4, Mover::Opponent));
}

#[test]
fn test_terminal_append_stamps_end_time() {
    let (_db, repo) = setup_test_db();
    let id = *repo.create_game(1).expect("Create failed").id();
    repo.append_moves(id, &[recorded(1, 0, 5, Mover::Player)], GameResult::PlayerWin)
        .expect("Append failed");

    let game = repo.find_game(id).unwrap().unwrap();
    assert_eq!(game.parse_result().unwrap(), GameResult::PlayerWin);
    assert!(game.ended_at().is_some());
}

#[test]
fn test_duplicate_turn_number_rejected_atomically() {
    let (_db, repo) = setup_test_db();
    let id = *repo.create_game(1).expect("Create failed").id();
    repo.append_moves(id, &[recorded(1, 0, 5, Mover::Player)], GameResult::InProgress)
        .expect("Append failed");

    let err = repo
        .append_moves(
            id,
            &[recorded(1, 1, 5, Mover::Player), recorded(2, 1, 4, Mover::Opponent)],
            GameResult::ComputerWin,
        )
        .unwrap_err();
    assert_eq!(err.kind, DbErrorKind::Constraint);

    // Neither the moves nor the result of the failed write are visible.
    assert_eq!(repo.load_moves(id).unwrap().len(), 1);
    let game = repo.find_game(id).unwrap().unwrap();
    assert_eq!(game.parse_result().unwrap(), GameResult::InProgress);
}

#[test]
fn test_end_game_missing_returns_false() {
    let (_db, repo) = setup_test_db();
    assert!(!repo.end_game(42, GameResult::Draw).expect("Update failed"));
}

#[test]
fn test_delete_game_cascades_to_moves() {
    let (_db, repo) = setup_test_db();
    let id = *repo.create_game(1).expect("Create failed").id();
    repo.append_moves(id, &[recorded(1, 0, 5, Mover::Player)], GameResult::InProgress)
        .expect("Append failed");

    assert!(repo.delete_game(id).expect("Delete failed"));
    assert!(repo.find_game(id).unwrap().is_none());
    assert!(repo.load_moves(id).unwrap().is_empty());
    assert!(!repo.delete_game(id).expect("Delete failed"));
}

// Replay sessions

#[test]
fn test_replay_moves_load_in_index_order() {
    let (_db, repo) = setup_replay_db();
    let session = repo.create_session(5, Some(12)).expect("Create failed");
    let id = *session.id();
    repo.add_move(id, 1, Placement::new(2, 4, Mover::Opponent)).unwrap();
    repo.add_move(id, 0, Placement::new(2, 5, Mover::Player)).unwrap();

    let placements: Vec<Placement> = repo
        .load_moves(id)
        .unwrap()
        .iter()
        .map(|row| row.to_placement().unwrap())
        .collect();
    assert_eq!(
        placements,
        vec![Placement::new(2, 5, Mover::Player), Placement::new(2, 4, Mover::Opponent)]
    );
}

#[test]
fn test_replay_duplicate_index_rejected() {
    let (_db, repo) = setup_replay_db();
    let id = *repo.create_session(5, None).unwrap().id();
    repo.add_move(id, 0, Placement::new(0, 5, Mover::Player)).unwrap();
    let err = repo
        .add_move(id, 0, Placement::new(1, 5, Mover::Player))
        .unwrap_err();
    assert!(err.is_constraint_violation());
}

#[test]
fn test_finish_session_only_once() {
    let (_db, repo) = setup_replay_db();
    let id = *repo.create_session(5, None).unwrap().id();

    assert!(repo.finish_session(id, GameResult::PlayerWin).unwrap());
    assert!(!repo.finish_session(id, GameResult::Draw).unwrap());

    let session = repo.get_session(id).unwrap().unwrap();
    assert!(session.is_finished());
    assert_eq!(session.parse_result().unwrap(), Some(GameResult::PlayerWin));
}

#[test]
fn test_list_sessions_scoped_and_limited() {
    let (_db, repo) = setup_replay_db();
    let ids: Vec<i32> = (0..3)
        .map(|_| *repo.create_session(8, None).unwrap().id())
        .collect();
    repo.create_session(9, None).unwrap();

    let listed = repo.list_sessions(8, 2).unwrap();
    let listed_ids: Vec<i32> = listed.iter().map(|s| *s.id()).collect();
    assert_eq!(listed_ids, vec![ids[2], ids[1]]);
    assert!(listed.iter().all(|s| *s.owner_identifier() == 8));
}

#[test]
fn test_purges_cascade_to_moves() {
    let (_db, repo) = setup_replay_db();
    let linked = *repo.create_session(8, Some(100)).unwrap().id();
    let other = *repo.create_session(8, Some(101)).unwrap().id();
    repo.add_move(linked, 0, Placement::new(0, 5, Mover::Player)).unwrap();
    repo.add_move(other, 0, Placement::new(0, 5, Mover::Player)).unwrap();

    assert_eq!(repo.delete_for_game(100).unwrap(), 1);
    assert!(repo.get_session(linked).unwrap().is_none());
    assert!(repo.load_moves(linked).unwrap().is_empty());
    assert!(repo.get_session(other).unwrap().is_some());

    assert_eq!(repo.delete_all_for_owner(8).unwrap(), 1);
    assert!(repo.load_moves(other).unwrap().is_empty());
    assert!(repo.list_sessions(8, 50).unwrap().is_empty());
}
