//! Game client: REST access, animation, local recording and replay.

mod animation;
mod api;
mod live;
mod player;
mod recorder;

pub use animation::{
    AnimationScheduler, AnimationTiming, BoardGeometry, FallingPiece, PlaybackMode, Tick,
};
pub use api::ApiClient;
pub use live::{LiveError, LiveSession, SessionEvent};
pub use player::{LoadedReplay, ReplayError, ReplayPlayer};
pub use recorder::{ReplayRecorder, ReplayStore};
