use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

const DROP_PREVIEW_CHARS: usize = 120;

/// One line emitted by the bridge on stdout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeMessage {
    Ready,
    BootComplete(BootInfo),
    TextStream { content: String },
    StatusUpdate(StatusUpdate),
    ToolStart(ToolStart),
    ToolLog { content: String },
    ToolDone(ToolDone),
    SubagentStart(SubagentStart),
    SubagentDone(SubagentDone),
    UserInputRequired(UserInputRequest),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootInfo {
    pub agent_id: String,
    pub session_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Running,
    Done,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub label: String,
    pub status: RunState,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolStart {
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDone {
    pub tool: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubagentStart {
    pub agent: String,
    #[serde(default)]
    pub task: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubagentDone {
    pub agent: String,
    pub success: bool,
}

/// Both request shapes share the `user_input_required` tag. The structured form is
/// recognised by its `payload` object; anything else must be a bootstrap prompt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserInputRequest {
    Form { payload: FormRequest },
    Bootstrap(BootstrapRequest),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootstrapMethod {
    Select,
    Confirm,
    Text,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapRequest {
    pub method: BootstrapMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl BootstrapRequest {
    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormRequest {
    pub tool_call_id: String,
    pub goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub allow_skip: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Choice,
    Multiselect,
    Yesno,
    Text,
}

fn default_required() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_if: Option<ShowIf>,
    pub why: String,
}

impl Question {
    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or_default()
    }
}

/// Condition on an earlier answer, e.g. `{"question_id": "has_account", "equals": true}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShowIf {
    pub question_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_equals: Option<Value>,
}

/// One line written to the bridge on stdin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrontendMessage {
    Start {
        task: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider: Option<String>,
        #[serde(
            rename = "maxTurns",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        max_turns: Option<u32>,
    },
    UserInput {
        value: Value,
    },
    UserInputResponse {
        payload: FormResponse,
    },
    SwitchAgent,
    Abort,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormResponse {
    pub tool_call_id: String,
    pub answers: Map<String, Value>,
    pub skipped: bool,
}

pub fn encode_line(message: &FrontendMessage) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Decodes one candidate line. Blank lines and anything that is not a known message are
/// dropped; a bad line must never end the session.
pub fn decode_line(line: &str) -> Option<BridgeMessage> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<BridgeMessage>(trimmed) {
        Ok(message) => Some(message),
        Err(error) => {
            let preview: String = trimmed.chars().take(DROP_PREVIEW_CHARS).collect();
            debug!(%error, line = %preview, "dropping bridge line");
            None
        }
    }
}
