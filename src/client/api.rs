//! REST client for the game server.

use anyhow::{Context, Result, bail};
use tracing::{debug, info, instrument, warn};

use crate::protocol::{
    EndGameRequest, ErrorBody, GameView, MoveView, PlayerMoveRequest, PlayerMoveResponse,
    StartGameRequest, StartGameResponse,
};

/// HTTP client for one game server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Creates a client for the server at `base_url`.
    #[instrument]
    pub fn new(base_url: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        info!(base_url = %base_url, "Creating API client");
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turns a non-success reply into an error carrying the server's message.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(err) => bail!("{} ({}): {}", status, err.code, err.error),
            Err(_) => bail!("{}: {}", status, body),
        }
    }

    /// Starts a game and returns its id.
    #[instrument(skip(self))]
    pub async fn start_game(&self, owner_identifier: i32) -> Result<i32> {
        let response = self
            .client
            .post(self.url("/api/games"))
            .json(&StartGameRequest { owner_identifier })
            .send()
            .await
            .context("Failed to reach game server")?;
        let started: StartGameResponse = Self::check(response).await?.json().await?;
        info!(game_id = started.game_id, "Game started");
        Ok(started.game_id)
    }

    /// Submits a player move.
    #[instrument(skip(self))]
    pub async fn player_move(&self, game_id: i32, column: usize) -> Result<PlayerMoveResponse> {
        let response = self
            .client
            .post(self.url(&format!("/api/games/{}/player-move", game_id)))
            .json(&PlayerMoveRequest {
                column: column as i64,
            })
            .send()
            .await
            .context("Failed to reach game server")?;
        let reply: PlayerMoveResponse = Self::check(response).await?.json().await?;
        debug!(?reply, "Move resolved");
        Ok(reply)
    }

    /// Ends a game with `result`, or a draw when absent.
    #[instrument(skip(self))]
    pub async fn end_game(&self, game_id: i32, result: Option<&str>) -> Result<()> {
        let response = self
            .client
            .put(self.url(&format!("/api/games/{}/end", game_id)))
            .json(&EndGameRequest {
                result: result.map(str::to_string),
            })
            .send()
            .await
            .context("Failed to reach game server")?;
        Self::check(response).await?;
        Ok(())
    }

    /// Fetches a game.
    #[instrument(skip(self))]
    pub async fn game(&self, game_id: i32) -> Result<GameView> {
        let response = self
            .client
            .get(self.url(&format!("/api/games/{}", game_id)))
            .send()
            .await
            .context("Failed to reach game server")?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Fetches a game's moves in turn order.
    #[instrument(skip(self))]
    pub async fn moves(&self, game_id: i32) -> Result<Vec<MoveView>> {
        let response = self
            .client
            .get(self.url(&format!("/api/games/{}/moves", game_id)))
            .send()
            .await
            .context("Failed to reach game server")?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Deletes a game. A game that is already gone is not an error.
    #[instrument(skip(self))]
    pub async fn delete_game(&self, game_id: i32) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/api/games/{}", game_id)))
            .send()
            .await
            .context("Failed to reach game server")?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            warn!(game_id, "Game already deleted on server");
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }
}
