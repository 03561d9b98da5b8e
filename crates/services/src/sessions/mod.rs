mod machine;
mod progress;
mod sink;
mod timer;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use machine::{
    Feedback, RoundEnd, SessionMachine, SessionPhase, SubmissionOutcome, TickOutcome,
};
pub use progress::{SessionProgress, SessionSnapshot};
pub use sink::ResultSink;
pub use timer::RoundTimer;
pub use view::{ResultHistoryService, ResultListItem};
pub use workflow::{FeedbackDelays, PracticeSession, SessionLoopService};
