//! Core environment context trait for Paddock phase runners.

use crate::random::RandomSource;
use async_trait::async_trait;
use std::time::{Duration, SystemTime};

/// The central interface for environment interaction.
///
/// This trait abstracts the "real world" so the weekend orchestrator can run
/// in both production (tokio) and the deterministic simulation harness.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, `StdRng::from_entropy`
/// - **Simulation**: `SimContext` - virtual clock, `ChaCha8Rng(seed)`
#[async_trait]
pub trait PaddockContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    fn now(&self) -> Duration;

    /// Returns the wall-clock time used for persisted timestamps.
    ///
    /// Post-race scheduling compares against this clock, so in simulation it
    /// is derived from the virtual clock plus an epoch offset.
    fn system_time(&self) -> SystemTime;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances the virtual clock
    async fn sleep(&self, duration: Duration);

    /// Returns an independent random stream for one unit of work.
    ///
    /// The simulation combines its master seed with `stream` so each league
    /// and phase gets a reproducible sequence that does not shift when other
    /// leagues are added or removed.
    fn derive_rng(&self, stream: u64) -> Box<dyn RandomSource + Send>;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    fn seed(&self) -> u64;
}
