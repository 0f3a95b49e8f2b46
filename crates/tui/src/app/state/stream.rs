use super::log::ScrollbackItem;

/// Live text from `text_stream` fragments that has not been committed to scrollback.
#[derive(Default)]
pub struct StreamBuffer {
    buffer: String,
}

impl StreamBuffer {
    pub fn push(&mut self, fragment: &str) {
        self.buffer.push_str(fragment);
    }

    pub fn live(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drains the buffer into agent entries: leading blank lines are skipped, the first
    /// non-blank line is flagged, and each remaining empty line becomes a blank entry.
    pub fn commit(&mut self) -> Vec<ScrollbackItem> {
        let text = std::mem::take(&mut self.buffer);
        if text.is_empty() {
            return Vec::new();
        }
        let mut items = Vec::new();
        let mut seen_first = false;
        for line in text
            .split('\n')
            .map(|line| line.trim_end_matches('\r'))
            .skip_while(|line| line.trim().is_empty())
        {
            if line.trim().is_empty() {
                items.push(ScrollbackItem::AgentBlank);
            } else {
                items.push(ScrollbackItem::AgentLine {
                    content: line.to_string(),
                    is_first: !seen_first,
                });
                seen_first = true;
            }
        }
        items
    }
}
