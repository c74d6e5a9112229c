//! One weekend phase on the real clock against a persistent store.
//!
//! This is what a scheduler invokes: qualifying, race and post-race each run
//! as a separate process against the same sled database, with production
//! time and entropy from `TokioContext`.

use crate::fixture::LeagueFixture;
use crate::newsroom::RecordingNewsroom;
use crate::sled_store::SledStore;
use paddock_core::store::LeagueStore;
use paddock_core::error::WeekendError;
use paddock_core::weekend::{PhaseReport, Stage, WeekendConfig, WeekendOrchestrator};
use paddock_env::{EnvError, TokioContext};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LiveError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Weekend(#[from] WeekendError),

    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// What one phase invocation did.
#[derive(Debug, Clone, Serialize)]
pub struct LiveRun {
    pub report: PhaseReport,
    pub seeded: bool,
    pub press_news: usize,
    pub office_news: usize,
}

/// Runs `stage` against the database at `db`. An empty database is seeded
/// from `fixture` first.
pub fn run_phase(db: &Path, stage: Stage, config: WeekendConfig, fixture: LeagueFixture) -> Result<LiveRun, LiveError> {
    let store = Arc::new(SledStore::open(db)?);
    let seeded = store.active_leagues()?.is_empty();
    if seeded {
        info!("No leagues in {}, seeding a fixture", db.display());
        fixture.seed_into(store.as_ref())?;
    }

    let newsroom = Arc::new(RecordingNewsroom::new());
    let orchestrator = WeekendOrchestrator::new(TokioContext::shared(), store, Arc::clone(&newsroom), config);

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let report = runtime.block_on(async {
        match stage {
            Stage::Qualifying => orchestrator.run_qualifying().await,
            Stage::Race => orchestrator.run_race().await,
            Stage::PostRace => orchestrator.run_post_race().await,
        }
    })?;

    Ok(LiveRun {
        report,
        seeded,
        press_news: newsroom.press_news().len(),
        office_news: newsroom.office_news().len(),
    })
}
