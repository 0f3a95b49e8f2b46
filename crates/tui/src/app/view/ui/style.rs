use crate::app::state::{DiagnosticLevel, ScrollbackItem, SubagentStatus};
use crate::app::view::theme::Theme;
use ratatui::style::Style;

/// Marker drawn in front of the first row of an entry. Continuation rows are indented to
/// the same width.
pub(super) fn marker_for(item: &ScrollbackItem) -> &'static str {
    match item {
        ScrollbackItem::User { .. } => "› ",
        ScrollbackItem::AgentLine { is_first: true, .. } => "● ",
        ScrollbackItem::AgentLine { .. } => "  ",
        ScrollbackItem::ToolStart { .. } => "⚙ ",
        ScrollbackItem::ToolLog { .. } => "  ⎿ ",
        ScrollbackItem::ToolDone { success: true, .. } => "✓ ",
        ScrollbackItem::ToolDone { .. } => "✗ ",
        ScrollbackItem::Subagent { .. } => "↳ ",
        ScrollbackItem::Diagnostic { level, .. } => match level {
            DiagnosticLevel::Info => "· ",
            DiagnosticLevel::Warn => "! ",
            DiagnosticLevel::Error => "✗ ",
        },
        ScrollbackItem::Spacing | ScrollbackItem::AgentBlank => "",
    }
}

pub(super) fn marker_style(item: &ScrollbackItem, theme: &Theme) -> Style {
    match item {
        ScrollbackItem::AgentLine { .. } => theme.agent_marker,
        _ => style_for(item, theme),
    }
}

pub(super) fn style_for(item: &ScrollbackItem, theme: &Theme) -> Style {
    match item {
        ScrollbackItem::User { .. } => theme.user,
        ScrollbackItem::AgentLine { .. } | ScrollbackItem::AgentBlank => theme.agent,
        ScrollbackItem::ToolStart { .. } => theme.tool,
        ScrollbackItem::ToolLog { .. } => theme.tool_log,
        ScrollbackItem::ToolDone { success: true, .. } => theme.tool_ok,
        ScrollbackItem::ToolDone { .. } => theme.tool_failed,
        ScrollbackItem::Subagent {
            success: Some(false),
            ..
        } => theme.tool_failed,
        ScrollbackItem::Subagent {
            status: SubagentStatus::Done,
            ..
        } => theme.tool_ok,
        ScrollbackItem::Subagent { .. } => theme.subagent,
        ScrollbackItem::Diagnostic { level, .. } => match level {
            DiagnosticLevel::Info => theme.info,
            DiagnosticLevel::Warn => theme.warn,
            DiagnosticLevel::Error => theme.error,
        },
        ScrollbackItem::Spacing => Style::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::view::theme::Theme;

    #[test]
    fn agent_marker_only_on_first_line() {
        let first = ScrollbackItem::AgentLine {
            content: "a".to_string(),
            is_first: true,
        };
        let rest = ScrollbackItem::AgentLine {
            content: "b".to_string(),
            is_first: false,
        };
        assert_eq!(marker_for(&first), "● ");
        assert_eq!(marker_for(&rest), "  ");
    }

    #[test]
    fn failed_subagent_uses_failure_style() {
        let theme = Theme::default();
        let failed = ScrollbackItem::Subagent {
            agent: "browser".to_string(),
            status: SubagentStatus::Done,
            success: Some(false),
        };
        let running = ScrollbackItem::Subagent {
            agent: "browser".to_string(),
            status: SubagentStatus::Running,
            success: None,
        };
        assert_eq!(style_for(&failed, &theme), theme.tool_failed);
        assert_eq!(style_for(&running, &theme), theme.subagent);
    }
}
