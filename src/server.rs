//! HTTP game server.
//!
//! Thin axum layer over [`MoveResolver`]. Resolver calls hit SQLite
//! synchronously, so every handler hops onto the blocking pool.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use derive_more::{Display, Error, From};
use tracing::{debug, error, info, instrument, warn};

use crate::games::connect_four::{MoveError, MoveLogStore, MoveResolver};
use crate::protocol::{
    EndGameRequest, ErrorBody, GameView, MoveView, OwnerQuery, PlayerMoveRequest,
    PlayerMoveResponse, StartGameRequest, StartGameResponse,
};

/// Resolver shared by all request handlers.
pub type SharedResolver<S> = Arc<MoveResolver<S>>;

/// Failure of a request handler.
#[derive(Debug, Display, Error, From)]
pub enum ApiError {
    /// The resolver refused or failed the request.
    #[display("{}", _0)]
    Move(MoveError),
    /// The blocking task running the resolver did not complete.
    #[display("Worker task failed: {}", _0)]
    Join(tokio::task::JoinError),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Move(MoveError::InvalidColumn { .. } | MoveError::InvalidOwner { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::Move(MoveError::ColumnFull { .. } | MoveError::GameFinished { .. }) => {
                StatusCode::CONFLICT
            }
            Self::Move(MoveError::GameNotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Move(
                MoveError::CorruptHistory { .. }
                | MoveError::IllegalOpponentChoice { .. }
                | MoveError::Storage { .. },
            )
            | Self::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Move(e) => e.code(),
            Self::Join(_) => "Internal",
        }
    }
}

impl From<crate::db::DbError> for ApiError {
    fn from(e: crate::db::DbError) -> Self {
        Self::Move(MoveError::from(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, error = %self, "Request failed");
        } else {
            warn!(status = %status, error = %self, "Request rejected");
        }
        let body = ErrorBody {
            error: self.to_string(),
            code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Runs `f` against the resolver on the blocking pool.
async fn blocking<S, T, F>(resolver: SharedResolver<S>, f: F) -> Result<T, ApiError>
where
    S: MoveLogStore + Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&MoveResolver<S>) -> Result<T, MoveError> + Send + 'static,
{
    let value = tokio::task::spawn_blocking(move || f(&resolver)).await??;
    Ok(value)
}

/// Builds the REST router.
#[instrument(skip(resolver))]
pub fn router<S>(resolver: SharedResolver<S>) -> Router
where
    S: MoveLogStore + Send + Sync + 'static,
{
    info!("Building game router");
    Router::new()
        .route("/api/games", post(start_game::<S>).get(list_games::<S>))
        .route("/api/games/{id}", get(get_game::<S>).delete(delete_game::<S>))
        .route("/api/games/{id}/end", put(end_game::<S>))
        .route("/api/games/{id}/player-move", post(player_move::<S>))
        .route("/api/games/{id}/moves", get(list_moves::<S>))
        .with_state(resolver)
}

#[instrument(skip(resolver))]
async fn start_game<S>(
    State(resolver): State<SharedResolver<S>>,
    Json(req): Json<StartGameRequest>,
) -> Result<(StatusCode, Json<StartGameResponse>), ApiError>
where
    S: MoveLogStore + Send + Sync + 'static,
{
    let owner = req.owner_identifier;
    let game = blocking(resolver, move |r| r.start_game(owner)).await?;
    Ok((
        StatusCode::CREATED,
        Json(StartGameResponse {
            game_id: *game.id(),
        }),
    ))
}

#[instrument(skip(resolver))]
async fn list_games<S>(
    State(resolver): State<SharedResolver<S>>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<GameView>>, ApiError>
where
    S: MoveLogStore + Send + Sync + 'static,
{
    let games = blocking(resolver, move |r| r.games_for_owner(query.owner)).await?;
    let views = games
        .iter()
        .map(GameView::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    debug!(count = views.len(), "Listing games");
    Ok(Json(views))
}

#[instrument(skip(resolver))]
async fn get_game<S>(
    State(resolver): State<SharedResolver<S>>,
    Path(id): Path<i32>,
) -> Result<Json<GameView>, ApiError>
where
    S: MoveLogStore + Send + Sync + 'static,
{
    let game = blocking(resolver, move |r| r.game(id)).await?;
    Ok(Json(GameView::try_from(&game)?))
}

#[instrument(skip(resolver))]
async fn delete_game<S>(
    State(resolver): State<SharedResolver<S>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError>
where
    S: MoveLogStore + Send + Sync + 'static,
{
    blocking(resolver, move |r| r.delete_game(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(resolver, req))]
async fn end_game<S>(
    State(resolver): State<SharedResolver<S>>,
    Path(id): Path<i32>,
    req: Option<Json<EndGameRequest>>,
) -> Result<StatusCode, ApiError>
where
    S: MoveLogStore + Send + Sync + 'static,
{
    let requested = req.and_then(|Json(body)| body.result);
    blocking(resolver, move |r| r.end_game(id, requested.as_deref())).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(resolver))]
async fn player_move<S>(
    State(resolver): State<SharedResolver<S>>,
    Path(id): Path<i32>,
    Json(req): Json<PlayerMoveRequest>,
) -> Result<Json<PlayerMoveResponse>, ApiError>
where
    S: MoveLogStore + Send + Sync + 'static,
{
    let outcome = blocking(resolver, move |r| r.play(id, req.column)).await?;
    Ok(Json(outcome.into()))
}

#[instrument(skip(resolver))]
async fn list_moves<S>(
    State(resolver): State<SharedResolver<S>>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<MoveView>>, ApiError>
where
    S: MoveLogStore + Send + Sync + 'static,
{
    let moves = blocking(resolver, move |r| r.moves(id)).await?;
    Ok(Json(moves.into_iter().map(MoveView::from).collect()))
}

/// Binds `host:port` and serves the router until the process exits.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
#[instrument(skip(resolver))]
pub async fn serve<S>(resolver: SharedResolver<S>, host: &str, port: u16) -> anyhow::Result<()>
where
    S: MoveLogStore + Send + Sync + 'static,
{
    let app = router(resolver);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!(host, port, "Game server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
