// Session lifecycle, score aggregation, and the engine facade for rallycounter.

pub mod debounce;
pub mod engine;
pub mod live;
pub mod scores;
pub mod session;

pub use debounce::debounce;
pub use engine::{DetectorState, RallyEngine};
pub use live::{spawn_engine_thread, EngineCommand};
pub use scores::ScoreAggregator;
pub use session::{FinalizedSession, SessionController, SessionEvent, StopReason};
