pub mod engine;
pub mod states;

pub use engine::{transition, FlowEngine, FlowTransitionError};
pub use states::{
    EventKind, FlowAction, LookupEvent, LookupPreview, ReportSession, RequestSeq,
    TransitionOutcome, WorkflowStage, WorkflowState,
};
