use ratatui::style::{Color, Modifier, Style};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThemeName {
    Default,
    Mono,
}

impl ThemeName {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" | "proxi" => Some(Self::Default),
            "mono" | "monochrome" | "plain" => Some(Self::Mono),
            _ => None,
        }
    }
}

/// Colours for every row kind the renderer draws. Built once at startup and borrowed by
/// the view code.
#[derive(Clone, Copy, Debug)]
pub struct Theme {
    pub user: Style,
    pub agent: Style,
    pub agent_marker: Style,
    pub tool: Style,
    pub tool_log: Style,
    pub tool_ok: Style,
    pub tool_failed: Style,
    pub subagent: Style,
    pub info: Style,
    pub warn: Style,
    pub error: Style,
    pub live: Style,
    pub status_active: Style,
    pub status_muted: Style,
    pub hitl_title: Style,
    pub hitl_selected: Style,
    pub input_bg: Color,
}

impl Theme {
    pub fn new(name: ThemeName) -> Self {
        match name {
            ThemeName::Default => Self::colored(),
            ThemeName::Mono => Self::mono(),
        }
    }

    fn colored() -> Self {
        let input_bg = Color::Rgb(40, 40, 40);
        Self {
            user: Style::default().fg(Color::White).bg(input_bg),
            agent: Style::default().fg(Color::White),
            agent_marker: Style::default().fg(Color::Rgb(124, 193, 255)),
            tool: Style::default().fg(Color::LightBlue),
            tool_log: Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
            tool_ok: Style::default().fg(Color::Green),
            tool_failed: Style::default().fg(Color::Red),
            subagent: Style::default().fg(Color::Magenta),
            info: Style::default().fg(Color::Cyan).add_modifier(Modifier::DIM),
            warn: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            live: Style::default().fg(Color::Gray),
            status_active: Style::default().fg(Color::Rgb(149, 208, 146)),
            status_muted: Style::default().add_modifier(Modifier::DIM),
            hitl_title: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            hitl_selected: Style::default()
                .fg(Color::Black)
                .bg(Color::Rgb(124, 193, 255)),
            input_bg,
        }
    }

    fn mono() -> Self {
        let plain = Style::default();
        let dim = Style::default().add_modifier(Modifier::DIM);
        let bold = Style::default().add_modifier(Modifier::BOLD);
        Self {
            user: bold,
            agent: plain,
            agent_marker: bold,
            tool: plain,
            tool_log: dim,
            tool_ok: plain,
            tool_failed: bold,
            subagent: plain,
            info: dim,
            warn: bold,
            error: bold.add_modifier(Modifier::UNDERLINED),
            live: dim,
            status_active: bold,
            status_muted: dim,
            hitl_title: bold,
            hitl_selected: Style::default().add_modifier(Modifier::REVERSED),
            input_bg: Color::Reset,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(ThemeName::Default)
    }
}
