/// Editable text used by the task composer and by free-text HITL answers.
#[derive(Default)]
pub struct InputState {
    buffer: Vec<char>,
    cursor: usize,
    history: Vec<String>,
    history_index: Option<usize>,
    history_draft: Option<String>,
    goal_column: Option<usize>,
}

impl InputState {
    pub fn current(&self) -> String {
        self.buffer.iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_from(&mut self, value: &str) {
        self.buffer = value.chars().collect();
        self.cursor = self.buffer.len();
        self.goal_column = None;
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.goal_column = None;
        self.history_index = None;
        self.history_draft = None;
    }

    pub fn insert_char(&mut self, ch: char) {
        self.buffer.insert(self.cursor, ch);
        self.cursor += 1;
        self.edited();
    }

    pub fn insert_str(&mut self, value: &str) {
        for ch in value.chars() {
            self.buffer.insert(self.cursor, ch);
            self.cursor += 1;
        }
        self.edited();
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        self.buffer.remove(self.cursor);
        self.edited();
    }

    pub fn delete(&mut self) {
        if self.cursor < self.buffer.len() {
            self.buffer.remove(self.cursor);
            self.edited();
        }
    }

    pub fn delete_word_back(&mut self) {
        let start = self.cursor;
        let mut cursor = self.cursor;
        while cursor > 0 && self.buffer[cursor - 1].is_whitespace() {
            cursor -= 1;
        }
        while cursor > 0 && !self.buffer[cursor - 1].is_whitespace() {
            cursor -= 1;
        }
        if cursor == start {
            return;
        }
        self.buffer.drain(cursor..start);
        self.cursor = cursor;
        self.edited();
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
        self.goal_column = None;
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.buffer.len());
        self.goal_column = None;
    }

    pub fn move_home(&mut self) {
        self.cursor = self.line_start(self.cursor);
        self.goal_column = None;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.line_end(self.cursor);
        self.goal_column = None;
    }

    /// Moves one line up inside a multi-line buffer; false when already on the first line.
    pub fn move_up(&mut self) -> bool {
        let start = self.line_start(self.cursor);
        if start == 0 {
            return false;
        }
        let column = *self.goal_column.get_or_insert(self.cursor - start);
        let prev_start = self.line_start(start - 1);
        let prev_len = (start - 1) - prev_start;
        self.cursor = prev_start + column.min(prev_len);
        true
    }

    pub fn move_down(&mut self) -> bool {
        let end = self.line_end(self.cursor);
        if end >= self.buffer.len() {
            return false;
        }
        let column = *self
            .goal_column
            .get_or_insert(self.cursor - self.line_start(self.cursor));
        let next_start = end + 1;
        let next_len = self.line_end(next_start) - next_start;
        self.cursor = next_start + column.min(next_len);
        true
    }

    pub fn record_history(&mut self, value: &str) {
        if value.trim().is_empty() || self.history.last().is_some_and(|last| last == value) {
            return;
        }
        self.history.push(value.to_string());
    }

    pub fn history_prev(&mut self) -> bool {
        if self.history.is_empty() {
            return false;
        }
        let index = match self.history_index {
            None => {
                self.history_draft = Some(self.current());
                self.history.len() - 1
            }
            Some(index) => index.saturating_sub(1),
        };
        self.history_index = Some(index);
        let value = self.history[index].clone();
        self.set_from(&value);
        true
    }

    pub fn history_next(&mut self) -> bool {
        let Some(index) = self.history_index else {
            return false;
        };
        if index + 1 < self.history.len() {
            self.history_index = Some(index + 1);
            let value = self.history[index + 1].clone();
            self.set_from(&value);
        } else {
            self.history_index = None;
            let draft = self.history_draft.take().unwrap_or_default();
            self.set_from(&draft);
        }
        true
    }

    fn edited(&mut self) {
        self.goal_column = None;
        self.history_index = None;
        self.history_draft = None;
    }

    fn line_start(&self, pos: usize) -> usize {
        self.buffer[..pos]
            .iter()
            .rposition(|ch| *ch == '\n')
            .map_or(0, |idx| idx + 1)
    }

    fn line_end(&self, pos: usize) -> usize {
        self.buffer[pos..]
            .iter()
            .position(|ch| *ch == '\n')
            .map_or(self.buffer.len(), |offset| pos + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::InputState;

    #[test]
    fn vertical_moves_keep_goal_column() {
        let mut input = InputState::default();
        input.set_from("12345\n12\n1234");

        assert!(input.move_up());
        assert_eq!(input.cursor(), 8);
        assert!(input.move_up());
        assert_eq!(input.cursor(), 4);
        assert!(!input.move_up());

        assert!(input.move_down());
        assert_eq!(input.cursor(), 8);
        assert!(input.move_down());
        assert_eq!(input.cursor(), 13);
        assert!(!input.move_down());
    }

    #[test]
    fn delete_word_back_removes_word_and_trailing_space() {
        let mut input = InputState::default();
        input.set_from("check my inbox  ");
        input.delete_word_back();
        assert_eq!(input.current(), "check my ");
        assert_eq!(input.cursor(), 9);
    }

    #[test]
    fn history_restores_draft_after_walking_forward() {
        let mut input = InputState::default();
        input.record_history("first");
        input.record_history("second");
        input.record_history("second");
        input.set_from("draft");

        assert!(input.history_prev());
        assert_eq!(input.current(), "second");
        assert!(input.history_prev());
        assert_eq!(input.current(), "first");
        assert!(input.history_next());
        assert_eq!(input.current(), "second");
        assert!(input.history_next());
        assert_eq!(input.current(), "draft");
        assert!(!input.history_next());
    }
}
