//! Local recording and replay through the client session.

use std::sync::Arc;

use tempfile::NamedTempFile;

use dropfour::client::{LiveSession, ReplayError, SessionEvent};
use dropfour::db::{REPLAY_MIGRATIONS, run_migrations};
use dropfour::protocol::{MoveView, PlayerMoveResponse};
use dropfour::{
    AnimationScheduler, AnimationTiming, BoardGeometry, GameResult, Mover, Placement,
    ReplayPlayer, ReplayRecorder, ReplayRepository, ReplayStore,
};

fn setup_replay_db() -> (NamedTempFile, ReplayRepository) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();
    run_migrations(&db_path, REPLAY_MIGRATIONS).expect("Migrations failed");
    let repo = ReplayRepository::new(db_path).expect("Failed to create repository");
    (db_file, repo)
}

fn scheduler() -> AnimationScheduler {
    AnimationScheduler::new(BoardGeometry::default(), AnimationTiming::default())
}

fn live_session(repo: &ReplayRepository, game_id: i32) -> (LiveSession, i32) {
    let store: Arc<dyn ReplayStore> = Arc::new(repo.clone());
    let recorder = ReplayRecorder::start(store, 3, Some(game_id));
    let session_id = recorder.session_id().expect("Session not created");
    let mut session = LiveSession::new(3, scheduler());
    session.attach_game(game_id, Some(recorder));
    (session, session_id)
}

fn drain(session: &mut LiveSession) -> SessionEvent {
    loop {
        match session.tick() {
            SessionEvent::Animating => {}
            other => return other,
        }
    }
}

/// Plays column 3 four times against replies in columns 0, 1, 2.
fn play_vertical_win(session: &mut LiveSession) -> Vec<Placement> {
    let mut expected = Vec::new();
    for turn in 0..4 {
        let player = Placement::new(3, 5 - turn, Mover::Player);
        let (opponent, result) = if turn < 3 {
            (Some(Placement::new(turn, 5, Mover::Opponent)), GameResult::InProgress)
        } else {
            (None, GameResult::PlayerWin)
        };
        session.begin_move(3).expect("Input locked");
        session.apply_reply(PlayerMoveResponse {
            player,
            opponent,
            result,
        });
        expected.push(player);
        expected.extend(opponent);

        let event = drain(session);
        if turn < 3 {
            assert_eq!(event, SessionEvent::Idle);
        } else {
            assert_eq!(event, SessionEvent::GameOver { result: GameResult::PlayerWin });
        }
    }
    expected
}

#[test]
fn test_replay_reproduces_landed_pieces() {
    let (_db, repo) = setup_replay_db();
    let (mut session, session_id) = live_session(&repo, 10);
    let expected = play_vertical_win(&mut session);

    let player = ReplayPlayer::new(repo.clone());
    let replay = player.load(session_id).unwrap();
    assert_eq!(replay.placements(), expected.as_slice());
    assert_eq!(replay.final_result(), Some(GameResult::PlayerWin));
    assert_eq!(*replay.session().linked_game_id(), Some(10));

    let live_board = session.scheduler().board().clone();
    session.start_replay(&replay).unwrap();
    assert!(session.is_replaying());
    assert!(!session.accepts_input());
    assert_eq!(
        drain(&mut session),
        SessionEvent::ReplayFinished {
            result: Some(GameResult::PlayerWin)
        }
    );
    assert_eq!(session.scheduler().board(), &live_board);

    // Replaying writes nothing.
    assert_eq!(repo.load_moves(session_id).unwrap().len(), expected.len());
    assert_eq!(repo.list_sessions(3, 50).unwrap().len(), 1);
    // Game was already over, so there is nothing to reload or finalize.
    assert!(!session.needs_resync());
    assert_eq!(session.finalize_on_close(), None);
}

#[test]
fn test_finish_twice_keeps_first_result() {
    let (_db, repo) = setup_replay_db();
    let store: Arc<dyn ReplayStore> = Arc::new(repo.clone());
    let mut recorder = ReplayRecorder::start(store, 3, None);
    assert!(recorder.append(Placement::new(0, 5, Mover::Player)));

    assert!(recorder.finish(GameResult::ComputerWin));
    assert!(!recorder.finish(GameResult::Draw));
    assert!(!recorder.append(Placement::new(1, 5, Mover::Player)));

    let session = repo.get_session(recorder.session_id().unwrap()).unwrap().unwrap();
    assert_eq!(session.parse_result().unwrap(), Some(GameResult::ComputerWin));
    assert_eq!(repo.load_moves(*session.id()).unwrap().len(), 1);
}

#[test]
fn test_recording_failure_does_not_stall_play() {
    let db_dir = tempfile::tempdir().unwrap();
    // A directory path cannot be opened as a database.
    let broken = ReplayRepository::new(db_dir.path().to_str().unwrap().to_string()).unwrap();
    let store: Arc<dyn ReplayStore> = Arc::new(broken);
    let recorder = ReplayRecorder::start(store, 3, Some(1));
    assert_eq!(recorder.session_id(), None);

    let mut session = LiveSession::new(3, scheduler());
    session.attach_game(1, Some(recorder));
    let expected = play_vertical_win(&mut session);
    assert!(session.is_game_over());
    assert_eq!(session.scheduler().board().heights().iter().sum::<usize>(), expected.len());
}

#[test]
fn test_closing_unfinished_game_records_draw() {
    let (_db, repo) = setup_replay_db();
    let (mut session, session_id) = live_session(&repo, 11);
    session.begin_move(2).unwrap();
    session.apply_reply(PlayerMoveResponse {
        player: Placement::new(2, 5, Mover::Player),
        opponent: Some(Placement::new(2, 4, Mover::Opponent)),
        result: GameResult::InProgress,
    });
    drain(&mut session);

    assert_eq!(session.finalize_on_close(), Some(11));
    assert_eq!(session.finalize_on_close(), None);
    let stored = repo.get_session(session_id).unwrap().unwrap();
    assert_eq!(stored.parse_result().unwrap(), Some(GameResult::Draw));
}

#[test]
fn test_replay_mid_game_then_resume_live() {
    let (_db, repo) = setup_replay_db();
    let (mut old, old_id) = live_session(&repo, 20);
    play_vertical_win(&mut old);

    let (mut session, live_id) = live_session(&repo, 21);
    session.begin_move(6).unwrap();
    session.apply_reply(PlayerMoveResponse {
        player: Placement::new(6, 5, Mover::Player),
        opponent: Some(Placement::new(5, 5, Mover::Opponent)),
        result: GameResult::InProgress,
    });
    drain(&mut session);

    let replay = ReplayPlayer::new(repo.clone()).load(old_id).unwrap();
    session.start_replay(&replay).unwrap();
    assert!(matches!(drain(&mut session), SessionEvent::ReplayFinished { .. }));
    assert!(session.needs_resync());
    assert!(!session.accepts_input());

    let history = vec![
        MoveView { column: 6, row: 5, mover: Mover::Player, turn_number: 1 },
        MoveView { column: 5, row: 5, mover: Mover::Opponent, turn_number: 2 },
    ];
    session.resume_live(&history).unwrap();
    assert!(session.accepts_input());
    assert_eq!(session.scheduler().board().heights()[6], 1);

    // Recording continues where it left off.
    session.begin_move(0).unwrap();
    session.apply_reply(PlayerMoveResponse {
        player: Placement::new(0, 5, Mover::Player),
        opponent: Some(Placement::new(1, 5, Mover::Opponent)),
        result: GameResult::InProgress,
    });
    drain(&mut session);
    let indices: Vec<i32> = repo
        .load_moves(live_id)
        .unwrap()
        .iter()
        .map(|row| *row.move_index())
        .collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[test]
fn test_missing_and_empty_sessions() {
    let (_db, repo) = setup_replay_db();
    let player = ReplayPlayer::new(repo.clone());
    assert!(matches!(player.load(404), Err(ReplayError::SessionNotFound { session_id: 404 })));

    let empty = *repo.create_session(3, None).unwrap().id();
    assert!(matches!(player.load(empty), Err(ReplayError::NoMoves { .. })));
}

#[test]
fn test_replay_refused_while_live_move_pending() {
    let (_db, repo) = setup_replay_db();
    let (mut old, old_id) = live_session(&repo, 30);
    play_vertical_win(&mut old);
    let replay = ReplayPlayer::new(repo.clone()).load(old_id).unwrap();

    let (mut session, live_id) = live_session(&repo, 31);
    session.begin_move(6).unwrap();
    assert!(session.start_replay(&replay).is_err());
    assert!(session.is_awaiting_reply());

    session.apply_reply(PlayerMoveResponse {
        player: Placement::new(6, 5, Mover::Player),
        opponent: Some(Placement::new(5, 5, Mover::Opponent)),
        result: GameResult::InProgress,
    });
    // Still refused while the reply's pieces are falling.
    assert!(session.start_replay(&replay).is_err());
    drain(&mut session);

    assert_eq!(repo.load_moves(live_id).unwrap().len(), 2);
    session.start_replay(&replay).unwrap();
    drain(&mut session);
    assert_eq!(repo.load_moves(live_id).unwrap().len(), 2);
}

#[test]
fn test_second_replay_waits_for_resync() {
    let (_db, repo) = setup_replay_db();
    let (mut old, old_id) = live_session(&repo, 40);
    play_vertical_win(&mut old);
    let replay = ReplayPlayer::new(repo.clone()).load(old_id).unwrap();

    let (mut session, _) = live_session(&repo, 41);
    session.start_replay(&replay).unwrap();
    drain(&mut session);
    assert!(session.needs_resync());
    assert!(!session.can_start_replay());
    assert!(session.start_replay(&replay).is_err());

    session.resume_live(&[]).unwrap();
    assert!(!session.is_replaying());
    assert!(session.accepts_input());
    assert!(session.can_start_replay());

    // A resync that lands mid-replay still hands control back to the live game.
    session.start_replay(&replay).unwrap();
    session.resume_live(&[]).unwrap();
    for _ in 0..100 {
        session.tick();
    }
    assert!(!session.is_replaying());
    assert!(session.accepts_input());
}

