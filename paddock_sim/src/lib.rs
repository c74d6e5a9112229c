//! Paddock deterministic simulation harness
//!
//! Runs whole race weekends against a virtual clock, seeded randomness and
//! in-memory or sled-backed stores, then checks what the engines produced.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ScenarioRunner                        │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ SimContext (virtual clock + ChaCha8 streams)          │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │       │                                                     │
//! │  ┌────▼───────────────┐   ┌──────────────┐                  │
//! │  │ WeekendOrchestrator │──►│ MemoryStore  │ or SledStore     │
//! │  └────────────────────┘   └──────────────┘                  │
//! │       │                        ▲                            │
//! │       ▼                        │ seeded by LeagueFixture    │
//! │  RecordingNewsroom        invariants (grid, race, awards)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! `run_phase` is the production path: one phase on the tokio clock
//! against a sled database, as a scheduled job runs it.
//!
//! # Usage
//!
//! ```ignore
//! use paddock_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).with_leagues(2).run(ScenarioId::FullWeekend);
//! assert!(result.passed);
//! ```

mod config;
mod context;
mod exporter;
mod fixture;
pub mod invariants;
mod live;
mod memory;
mod newsroom;
mod runner;
mod sled_store;
mod store;
pub mod scenarios;

pub use config::{load_config, ConfigError};
pub use context::SimContext;
pub use exporter::{ClassifiedDriver, RaceExport};
pub use fixture::{FixtureData, LeagueFixture, TeamKind};
pub use live::{run_phase, LiveError, LiveRun};
pub use memory::{MemoryStore, StoreWrite};
pub use newsroom::RecordingNewsroom;
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner, StoreKind};
pub use sled_store::{SledStore, LAP_SAMPLE_STRIDE};
pub use store::{FixtureSink, ScenarioStore};
