pub(crate) mod client;
pub(crate) mod framing;
pub(crate) mod protocol;

pub(crate) use client::{
    spawn_bridge, BridgeProcess, Disconnected, ExitOutcome, MessageSink, SupervisorEvent,
};
