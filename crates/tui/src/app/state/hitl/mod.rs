pub(crate) mod form;

pub(crate) use form::{FormOutcome, FormWalker, Step};

use crate::app::runtime::protocol::{
    BootstrapMethod, BootstrapRequest, FormResponse, FrontendMessage, UserInputRequest,
};
use crate::error::SessionError;
use serde_json::Value;

pub enum PendingRequest {
    Bootstrap(BootstrapRequest),
    Form(FormWalker),
}

/// What the operator gave for a bootstrap prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BootstrapAnswer {
    Confirm(bool),
    Select(String),
    Text(String),
    Cancel,
}

/// Bootstrap cancellation is sent as boolean `false`; the bridge reads it as "no answer".
fn cancellation_value() -> Value {
    Value::Bool(false)
}

/// Holds at most one outstanding `user_input_required` request. Replies are built
/// without touching state; the caller clears the request once the reply was sent.
#[derive(Default)]
pub struct HitlCorrelator {
    pending: Option<PendingRequest>,
}

impl HitlCorrelator {
    /// Stores the request; returns false and keeps the current one if a request is
    /// already pending.
    pub fn begin(&mut self, request: UserInputRequest) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.pending = Some(match request {
            UserInputRequest::Bootstrap(request) => PendingRequest::Bootstrap(request),
            UserInputRequest::Form { payload } => PendingRequest::Form(FormWalker::new(payload)),
        });
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut FormWalker> {
        match self.pending.as_mut() {
            Some(PendingRequest::Form(walker)) => Some(walker),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }

    pub fn bootstrap_reply(&self, answer: BootstrapAnswer) -> Result<FrontendMessage, SessionError> {
        let request = match &self.pending {
            None => return Err(SessionError::NoPendingRequest),
            Some(PendingRequest::Form(_)) => return Err(SessionError::WrongResponseShape),
            Some(PendingRequest::Bootstrap(request)) => request,
        };
        let value = match (request.method, answer) {
            (BootstrapMethod::Confirm, BootstrapAnswer::Confirm(yes)) => Value::Bool(yes),
            (BootstrapMethod::Confirm, BootstrapAnswer::Cancel) => Value::Bool(false),
            (BootstrapMethod::Select, BootstrapAnswer::Select(choice)) => {
                if !request.options().iter().any(|option| *option == choice) {
                    return Err(SessionError::InvalidOption(choice));
                }
                Value::String(choice)
            }
            (BootstrapMethod::Text, BootstrapAnswer::Text(text)) => Value::String(text),
            (BootstrapMethod::Select | BootstrapMethod::Text, BootstrapAnswer::Cancel) => {
                cancellation_value()
            }
            _ => return Err(SessionError::WrongResponseShape),
        };
        Ok(FrontendMessage::UserInput { value })
    }

    pub fn form_reply(&self, outcome: FormOutcome) -> Result<FrontendMessage, SessionError> {
        match &self.pending {
            None => Err(SessionError::NoPendingRequest),
            Some(PendingRequest::Bootstrap(_)) => Err(SessionError::WrongResponseShape),
            Some(PendingRequest::Form(walker)) => Ok(FrontendMessage::UserInputResponse {
                payload: FormResponse {
                    tool_call_id: walker.request().tool_call_id.clone(),
                    answers: outcome.answers,
                    skipped: outcome.skipped,
                },
            }),
        }
    }
}
