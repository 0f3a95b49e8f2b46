use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubagentStatus {
    Running,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warn,
    Error,
}

/// One rendered entry of session history.
#[derive(Clone, Debug, PartialEq)]
pub enum ScrollbackItem {
    User {
        content: String,
    },
    Spacing,
    AgentLine {
        content: String,
        is_first: bool,
    },
    AgentBlank,
    ToolStart {
        tool: String,
        arguments: Option<Value>,
    },
    ToolLog {
        content: String,
    },
    ToolDone {
        tool: String,
        success: bool,
        output: Option<String>,
        error: Option<String>,
    },
    Subagent {
        agent: String,
        status: SubagentStatus,
        success: Option<bool>,
    },
    Diagnostic {
        level: DiagnosticLevel,
        text: String,
    },
}

impl ScrollbackItem {
    pub fn diagnostic(level: DiagnosticLevel, text: impl Into<String>) -> Self {
        Self::Diagnostic {
            level,
            text: text.into(),
        }
    }

    /// A finished tool or sub-agent; a following user prompt gets a separator.
    fn is_terminal_completion(&self) -> bool {
        matches!(
            self,
            Self::ToolDone { .. }
                | Self::Subagent {
                    status: SubagentStatus::Done,
                    ..
                }
        )
    }
}

/// Append-only session history. Only a running sub-agent entry may change after it
/// was appended; `clear` is the one front-end reset.
#[derive(Default)]
pub struct Scrollback {
    items: Vec<ScrollbackItem>,
    version: u64,
}

impl Scrollback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[ScrollbackItem] {
        &self.items
    }

    /// Bumped on every change so renderers can cache wrapped rows.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn append(&mut self, item: ScrollbackItem) {
        self.append_all(vec![item]);
    }

    /// Appends a batch in one step. The separator rule looks only at the entry
    /// preceding the batch.
    pub fn append_all(&mut self, batch: Vec<ScrollbackItem>) {
        if batch.is_empty() {
            return;
        }
        let needs_separator = matches!(batch.first(), Some(ScrollbackItem::User { .. }))
            && self
                .items
                .last()
                .is_some_and(ScrollbackItem::is_terminal_completion);
        self.items.reserve(batch.len() + usize::from(needs_separator));
        if needs_separator {
            self.items.push(ScrollbackItem::Spacing);
        }
        self.items.extend(batch);
        self.version += 1;
    }

    /// Marks the most recently appended running entry for `agent` as done. Returns false
    /// when no such entry exists.
    pub fn complete_subagent(&mut self, agent: &str, succeeded: bool) -> bool {
        let target = self.items.iter_mut().rev().find(|item| {
            matches!(
                item,
                ScrollbackItem::Subagent {
                    agent: name,
                    status: SubagentStatus::Running,
                    ..
                } if name == agent
            )
        });
        let Some(ScrollbackItem::Subagent {
            status, success, ..
        }) = target
        else {
            return false;
        };
        *status = SubagentStatus::Done;
        *success = Some(succeeded);
        self.version += 1;
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(text: &str) -> ScrollbackItem {
        ScrollbackItem::User {
            content: text.to_string(),
        }
    }

    fn running(agent: &str) -> ScrollbackItem {
        ScrollbackItem::Subagent {
            agent: agent.to_string(),
            status: SubagentStatus::Running,
            success: None,
        }
    }

    #[test]
    fn complete_subagent_rewrites_latest_running_entry_only() {
        let mut log = Scrollback::new();
        log.append(running("x"));
        log.append(running("x"));
        assert!(log.complete_subagent("x", true));

        assert_eq!(log.items()[0], running("x"));
        assert_eq!(
            log.items()[1],
            ScrollbackItem::Subagent {
                agent: "x".to_string(),
                status: SubagentStatus::Done,
                success: Some(true),
            }
        );

        assert!(log.complete_subagent("x", false));
        assert!(!log.complete_subagent("x", true));
        assert!(!log.complete_subagent("other", true));
    }

    #[test]
    fn user_after_tool_done_gets_a_separator() {
        let mut log = Scrollback::new();
        log.append(ScrollbackItem::ToolDone {
            tool: "read_file".to_string(),
            success: true,
            output: None,
            error: None,
        });
        log.append_all(vec![user("next"), ScrollbackItem::Spacing]);
        assert_eq!(
            log.items()[1..],
            [ScrollbackItem::Spacing, user("next"), ScrollbackItem::Spacing]
        );
    }

    #[test]
    fn user_after_finished_subagent_gets_a_separator() {
        let mut log = Scrollback::new();
        log.append(running("browser"));
        log.append(user("too early"));
        assert_eq!(log.items().len(), 2);

        log.complete_subagent("browser", true);
        log.append(ScrollbackItem::Spacing);
        log.append(user("later"));
        assert_eq!(log.items().len(), 4);

        let mut log = Scrollback::new();
        log.append(running("browser"));
        log.complete_subagent("browser", true);
        log.append(user("after"));
        assert_eq!(log.items()[1], ScrollbackItem::Spacing);
    }

    #[test]
    fn separator_is_computed_once_per_batch() {
        let mut log = Scrollback::new();
        log.append(ScrollbackItem::ToolDone {
            tool: "t".to_string(),
            success: false,
            output: None,
            error: Some("boom".to_string()),
        });
        log.append_all(vec![
            ScrollbackItem::AgentLine {
                content: "a".to_string(),
                is_first: true,
            },
            user("not first in batch"),
        ]);
        assert_eq!(log.items().len(), 3);
    }

    #[test]
    fn version_tracks_changes() {
        let mut log = Scrollback::new();
        let start = log.version();
        log.append_all(Vec::new());
        assert_eq!(log.version(), start);
        log.append(user("hi"));
        assert!(log.version() > start);
        let before_clear = log.version();
        log.clear();
        assert!(log.items().is_empty());
        assert!(log.version() > before_clear);
    }
}
