//! Paddock Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seam that lets the Paddock weekend
//! engines run both in **Production** (tokio clock, OS entropy) and in the
//! deterministic **Simulation** harness.
//!
//! # Core Concept
//!
//! Everything that would make a race weekend non-reproducible is intercepted:
//! - Time (`now()`, `system_time()`, `sleep()`)
//! - Randomness (`derive_rng()` and the [`RandomSource`] trait)
//!
//! The performance model and race loop never touch a global RNG; they take a
//! `&mut R where R: RandomSource`, so tests can script every draw.
//!
//! # Example
//!
//! ```ignore
//! use paddock_env::{PaddockContext, RandomSource};
//!
//! async fn staggered<Ctx: PaddockContext>(ctx: &Ctx, leagues: &[String]) {
//!     for (idx, league) in leagues.iter().enumerate() {
//!         if idx > 0 {
//!             ctx.sleep(Duration::from_secs(300)).await;
//!         }
//!         let mut rng = ctx.derive_rng(idx as u64);
//!         process(league, &mut *rng);
//!     }
//! }
//! ```

mod context;
mod random;
mod types;
mod error;
mod tokio_impl;

pub use context::PaddockContext;
pub use random::{RandomSource, SequenceSource};
pub use types::{DriverId, TeamId, RaceId};
pub use error::EnvError;
pub use tokio_impl::TokioContext;
