use thiserror::Error;

/// Failures talking to (or starting) the bridge process.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("bridge command is empty (set PROXI_BRIDGE_BIN)")]
    EmptyCommand,

    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("bridge process has no {0} pipe")]
    MissingPipe(&'static str),

    #[error("bridge i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("bridge is not running")]
    Closed,
}

/// Local actions rejected before anything reaches the bridge.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("backend is not ready yet")]
    NotReady,

    #[error("answer the pending input request first")]
    HitlPending,

    #[error("no input request is pending")]
    NoPendingRequest,

    #[error("task is empty")]
    EmptyTask,

    #[error("answer does not match the pending request")]
    WrongResponseShape,

    #[error("`{0}` is not one of the offered options")]
    InvalidOption(String),

    #[error("this form cannot be skipped")]
    SkipNotAllowed,

    #[error("send failed: {0}")]
    Send(#[from] BridgeError),
}

/// Validation failures while filling in a structured form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("an answer is required for `{0}`")]
    AnswerRequired(String),

    #[error("no question is waiting for an answer")]
    NoActiveQuestion,

    #[error("option {0} is out of range")]
    OptionOutOfRange(usize),

    #[error("answer kind does not fit the current question")]
    WrongQuestionType,
}
