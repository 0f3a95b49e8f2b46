use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const TAB_STOP: usize = 4;

pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0).max(1)
}

pub fn display_width(value: &str) -> usize {
    UnicodeWidthStr::width(value)
}

/// Makes bridge-provided text safe to draw on one terminal row: escape sequences are
/// removed, tabs expanded, CR dropped and other controls blanked.
pub fn sanitize_for_tui(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut col = 0_usize;
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\x1b' => skip_escape(&mut chars),
            '\t' => {
                let spaces = TAB_STOP - (col % TAB_STOP);
                out.extend(std::iter::repeat(' ').take(spaces));
                col += spaces;
            }
            '\r' => {}
            c if c.is_control() => {
                out.push(' ');
                col += 1;
            }
            c => {
                out.push(c);
                col += char_width(c);
            }
        }
    }
    out
}

fn skip_escape(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    match chars.next() {
        // CSI: parameters until a final byte in 0x40..=0x7e.
        Some('[') => {
            for ch in chars.by_ref() {
                if ('\x40'..='\x7e').contains(&ch) {
                    break;
                }
            }
        }
        // OSC: terminated by BEL or ESC \.
        Some(']') => {
            while let Some(ch) = chars.next() {
                if ch == '\x07' {
                    break;
                }
                if ch == '\x1b' && chars.next_if_eq(&'\\').is_some() {
                    break;
                }
            }
        }
        _ => {}
    }
}

/// Normalises pasted text for the composer; newlines survive, everything else that
/// would move the cursor does not.
pub fn sanitize_paste(value: &str) -> String {
    let normalized = value.replace("\r\n", "\n").replace('\r', "\n");
    normalized
        .chars()
        .map(|ch| match ch {
            '\n' => "\n".to_string(),
            '\t' => " ".repeat(TAB_STOP),
            c if c.is_control() => " ".to_string(),
            c => c.to_string(),
        })
        .collect()
}

/// Wraps at word boundaries where possible, hard-splitting words wider than `width`.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }
    let mut rows = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;
    for word in line.split_inclusive(' ') {
        if current_width > 0 && current_width + display_width(word.trim_end()) > width {
            rows.push(std::mem::take(&mut current).trim_end().to_string());
            current_width = 0;
        }
        for ch in word.chars() {
            let ch_width = char_width(ch);
            if current_width + ch_width > width && !current.is_empty() {
                rows.push(std::mem::take(&mut current));
                current_width = 0;
                if ch == ' ' {
                    continue;
                }
            }
            current.push(ch);
            current_width += ch_width;
        }
    }
    rows.push(current);
    rows
}

/// Cuts `value` to at most `width` columns, ending with `…` when shortened.
pub fn truncate_to_width(value: &str, width: usize) -> String {
    if display_width(value) <= width {
        return value.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in value.chars() {
        let ch_width = char_width(ch);
        if used + ch_width + 1 > width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_ansi_and_expands_tabs() {
        assert_eq!(sanitize_for_tui("\x1b[31mred\x1b[0m\tok\r"), "red ok");
        assert_eq!(sanitize_for_tui("ab\tc"), "ab  c");
        assert_eq!(sanitize_for_tui("\x1b]0;title\x07text"), "text");
        assert_eq!(sanitize_for_tui("\x1b]8;;url\x1b\\link"), "link");
        assert_eq!(sanitize_for_tui("bell\x07"), "bell ");
    }

    #[test]
    fn sanitize_paste_normalizes_line_endings() {
        assert_eq!(sanitize_paste("a\r\n\r\nb\tc\x07\r\n"), "a\n\nb    c \n");
        assert_eq!(sanitize_paste("one\rtwo"), "one\ntwo");
        assert_eq!(sanitize_paste("line1\n\nline2"), "line1\n\nline2");
    }

    #[test]
    fn wrap_prefers_word_boundaries() {
        assert_eq!(wrap_line("hello there world", 11), vec!["hello there", "world"]);
        assert_eq!(wrap_line("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap_line("", 5), vec![""]);
        assert!(wrap_line("x", 0).is_empty());
    }

    #[test]
    fn wrap_counts_wide_characters() {
        assert_eq!(wrap_line("日本語", 4), vec!["日本", "語"]);
    }

    #[test]
    fn truncate_adds_ellipsis_only_when_needed() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("a longer label", 6), "a lon…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }
}
