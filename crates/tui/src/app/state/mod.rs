pub(crate) mod hitl;
pub(crate) mod input;
pub(crate) mod log;
pub(crate) mod status;
pub(crate) mod stream;

pub(crate) use input::InputState;
pub(crate) use log::{DiagnosticLevel, ScrollbackItem, SubagentStatus};
