pub mod counters;
pub mod orchestrator;
pub mod status;

pub use self::counters::SessionCounters;
pub use self::orchestrator::{
    AttemptEvent, AttemptMessage, AttemptOutcome, PortalClient, SessionControl, SessionOrchestrator, TickDecision,
};
pub use self::status::{SessionStatus, StatusReport, StatusSink};
