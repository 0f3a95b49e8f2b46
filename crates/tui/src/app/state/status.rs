use crate::app::runtime::protocol::RunState;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusCategory {
    Tool,
    Subagent,
    #[default]
    Progress,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusView {
    pub label: Option<String>,
    pub category: StatusCategory,
    pub active: bool,
}

pub fn category_for(label: &str) -> StatusCategory {
    let trimmed = label.trim_start();
    if trimmed.starts_with("Tool:") {
        return StatusCategory::Tool;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.contains("subagent") || lower.contains("sub-agent") {
        return StatusCategory::Subagent;
    }
    StatusCategory::Progress
}

/// Pure mapping from one `status_update` to what the status line shows.
pub fn classify(label: &str, state: RunState) -> StatusView {
    match state {
        RunState::Running => StatusView {
            label: Some(label.to_string()),
            category: category_for(label),
            active: true,
        },
        RunState::Done => StatusView::default(),
    }
}
