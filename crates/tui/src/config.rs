use crate::app::view::theme::ThemeName;
use std::path::PathBuf;

const DEFAULT_BRIDGE_COMMAND: &str = "python -m proxi.bridge";
const CREDENTIAL_KEYS: &[&str] = &[
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "OPENROUTER_API_KEY",
    "NOTION_API_KEY",
    "GOOGLE_APPLICATION_CREDENTIALS",
];

#[derive(Clone, Debug)]
pub struct Config {
    pub bridge_command: Vec<String>,
    pub working_dir: PathBuf,
    pub provider: Option<String>,
    pub max_turns: Option<u32>,
    pub forward_env: Vec<String>,
    pub initial_message: Option<String>,
    pub theme: ThemeName,
    pub log_file: PathBuf,
    pub show_stderr: bool,
    /// Problems found while reading flags and env; shown once the UI is up.
    pub warnings: Vec<String>,
}

/// Shell-style split; unbalanced quotes degrade to a plain whitespace split.
fn split_args(value: &str) -> Result<Vec<String>, (Vec<String>, shell_words::ParseError)> {
    shell_words::split(value)
        .map(|parts| parts.into_iter().filter(|part| !part.is_empty()).collect())
        .map_err(|error| (value.split_whitespace().map(str::to_string).collect(), error))
}

fn parse_bool_like(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Flags are matched as `--name value` or `--name=value`.
fn take_flag_value(
    arg: &str,
    names: &[&str],
    args: &mut std::iter::Peekable<impl Iterator<Item = String>>,
) -> Option<Option<String>> {
    for name in names {
        if arg == *name {
            return Some(args.next_if(|next| !next.starts_with("--")));
        }
        if let Some(value) = arg
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('='))
        {
            return Some(Some(value.to_string()));
        }
    }
    None
}

impl Config {
    pub fn load() -> Self {
        Self::from_sources(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    pub fn from_sources(
        args: impl IntoIterator<Item = impl AsRef<str>>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut warnings = Vec::new();

        let bridge_command = match split_args(
            non_empty(env("PROXI_BRIDGE_BIN"))
                .as_deref()
                .unwrap_or(DEFAULT_BRIDGE_COMMAND),
        ) {
            Ok(parts) => parts,
            Err((parts, error)) => {
                warnings.push(format!(
                    "PROXI_BRIDGE_BIN has unbalanced quotes ({error}); split on whitespace instead"
                ));
                parts
            }
        };
        let mut working_dir = non_empty(env("PROXI_WORKING_DIR")).map(PathBuf::from);
        let mut provider = non_empty(env("PROXI_PROVIDER"));
        let mut max_turns_raw = non_empty(env("PROXI_MAX_TURNS"));
        let mut theme_raw = non_empty(env("PROXI_TUI_THEME"));
        let mut log_file = non_empty(env("PROXI_TUI_LOG")).map(PathBuf::from);
        let show_stderr = env("PROXI_TUI_DEBUG")
            .as_deref()
            .and_then(parse_bool_like)
            .unwrap_or(false);
        let mut initial_message = None;

        let mut args = args
            .into_iter()
            .map(|arg| arg.as_ref().to_string())
            .peekable();
        while let Some(arg) = args.next() {
            if let Some(value) = take_flag_value(&arg, &["--cwd"], &mut args) {
                match non_empty(value) {
                    Some(value) => working_dir = Some(PathBuf::from(value)),
                    None => warnings.push("--cwd needs a directory".to_string()),
                }
            } else if let Some(value) = take_flag_value(&arg, &["--provider"], &mut args) {
                match non_empty(value) {
                    Some(value) => provider = Some(value),
                    None => warnings.push("--provider needs a name".to_string()),
                }
            } else if let Some(value) = take_flag_value(&arg, &["--max-turns"], &mut args) {
                match non_empty(value) {
                    Some(value) => max_turns_raw = Some(value),
                    None => warnings.push("--max-turns needs a number".to_string()),
                }
            } else if let Some(value) = take_flag_value(&arg, &["--theme"], &mut args) {
                if let Some(value) = non_empty(value) {
                    theme_raw = Some(value);
                }
            } else if let Some(value) =
                take_flag_value(&arg, &["--initial-message", "-m"], &mut args)
            {
                match non_empty(value) {
                    Some(value) => initial_message = Some(value),
                    None => warnings.push("--initial-message needs text".to_string()),
                }
            } else if let Some(value) = take_flag_value(&arg, &["--log-file"], &mut args) {
                if let Some(value) = non_empty(value) {
                    log_file = Some(PathBuf::from(value));
                }
            } else {
                warnings.push(format!("ignoring unknown argument `{arg}`"));
            }
        }

        let max_turns = max_turns_raw.and_then(|raw| match raw.parse::<u32>() {
            Ok(value) if value > 0 => Some(value),
            _ => {
                warnings.push(format!("ignoring invalid max turns `{raw}`"));
                None
            }
        });

        let theme = match theme_raw {
            Some(raw) => ThemeName::parse(&raw).unwrap_or_else(|| {
                warnings.push(format!("unknown theme `{raw}`, using default"));
                ThemeName::Default
            }),
            None => ThemeName::Default,
        };

        let working_dir = working_dir
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let log_file = log_file.unwrap_or_else(|| working_dir.join("logs").join("proxi-tui.log"));

        let mut forward_env: Vec<String> = CREDENTIAL_KEYS.iter().map(|k| k.to_string()).collect();
        if let Some(extra) = env("PROXI_FORWARD_ENV") {
            for key in extra.split(',').map(str::trim).filter(|key| !key.is_empty()) {
                if !forward_env.iter().any(|existing| existing == key) {
                    forward_env.push(key.to_string());
                }
            }
        }

        Self {
            bridge_command,
            working_dir,
            provider,
            max_turns,
            forward_env,
            initial_message,
            theme,
            log_file,
            show_stderr,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{split_args, Config};
    use crate::app::view::theme::ThemeName;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config_with(args: &[&str], env: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_sources(args.iter().copied(), |key| env.get(key).cloned())
    }

    #[test]
    fn split_args_supports_quoted_values() {
        let args = split_args("python -m proxi.bridge --label \"hello world\"").expect("split");
        assert_eq!(
            args,
            vec!["python", "-m", "proxi.bridge", "--label", "hello world"]
        );
    }

    #[test]
    fn split_args_falls_back_when_quotes_are_unbalanced() {
        let (args, _) = split_args("python \"unterminated").expect_err("unbalanced");
        assert_eq!(args, vec!["python", "\"unterminated"]);

        let config = config_with(&[], &[("PROXI_BRIDGE_BIN", "python \"unterminated")]);
        assert_eq!(config.bridge_command, vec!["python", "\"unterminated"]);
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].contains("PROXI_BRIDGE_BIN"));
    }

    #[test]
    fn defaults_without_env_or_flags() {
        let config = config_with(&[], &[]);
        assert_eq!(config.bridge_command, vec!["python", "-m", "proxi.bridge"]);
        assert_eq!(config.provider, None);
        assert_eq!(config.max_turns, None);
        assert_eq!(config.theme, ThemeName::Default);
        assert!(!config.show_stderr);
        assert!(config.forward_env.iter().any(|key| key == "OPENAI_API_KEY"));
        assert!(config.log_file.ends_with("logs/proxi-tui.log"));
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn env_values_are_read() {
        let config = config_with(
            &[],
            &[
                ("PROXI_BRIDGE_BIN", "/opt/venv/bin/python -m proxi.bridge"),
                ("PROXI_WORKING_DIR", "/srv/proxi"),
                ("PROXI_PROVIDER", "anthropic"),
                ("PROXI_MAX_TURNS", "8"),
                ("PROXI_TUI_DEBUG", "yes"),
                ("PROXI_FORWARD_ENV", "EXTRA_TOKEN, OPENAI_API_KEY ,"),
            ],
        );
        assert_eq!(config.bridge_command[0], "/opt/venv/bin/python");
        assert_eq!(config.working_dir, PathBuf::from("/srv/proxi"));
        assert_eq!(config.provider.as_deref(), Some("anthropic"));
        assert_eq!(config.max_turns, Some(8));
        assert!(config.show_stderr);
        assert_eq!(
            config
                .forward_env
                .iter()
                .filter(|key| *key == "OPENAI_API_KEY")
                .count(),
            1
        );
        assert!(config.forward_env.iter().any(|key| key == "EXTRA_TOKEN"));
        assert_eq!(
            config.log_file,
            PathBuf::from("/srv/proxi/logs/proxi-tui.log")
        );
    }

    #[test]
    fn flags_override_env() {
        let config = config_with(
            &[
                "--provider=openai",
                "--max-turns",
                "30",
                "-m",
                "summarise my inbox",
                "--theme",
                "mono",
                "--cwd",
                "/tmp/work",
            ],
            &[("PROXI_PROVIDER", "anthropic"), ("PROXI_MAX_TURNS", "8")],
        );
        assert_eq!(config.provider.as_deref(), Some("openai"));
        assert_eq!(config.max_turns, Some(30));
        assert_eq!(config.initial_message.as_deref(), Some("summarise my inbox"));
        assert_eq!(config.theme, ThemeName::Mono);
        assert_eq!(config.working_dir, PathBuf::from("/tmp/work"));
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn bad_values_become_warnings() {
        let config = config_with(
            &["--max-turns", "lots", "--theme=neon", "--wat"],
            &[],
        );
        assert_eq!(config.max_turns, None);
        assert_eq!(config.theme, ThemeName::Default);
        assert_eq!(config.warnings.len(), 3);
    }

    #[test]
    fn flag_without_value_does_not_swallow_next_flag() {
        let config = config_with(&["--provider", "--max-turns", "4"], &[]);
        assert_eq!(config.provider, None);
        assert_eq!(config.max_turns, Some(4));
        assert_eq!(config.warnings, vec!["--provider needs a name".to_string()]);
    }
}
