use crate::app::runtime::protocol::{FormRequest, Question, QuestionKind};
use crate::error::FormError;
use serde_json::{Map, Value};

pub const CUSTOM_OPTION_LABEL: &str = "Other (type your own)";

#[derive(Clone, Debug, PartialEq)]
pub struct FormOutcome {
    pub answers: Map<String, Value>,
    pub skipped: bool,
}

#[derive(Debug, PartialEq)]
pub enum Step {
    Next,
    AwaitingCustomText,
    Complete(FormOutcome),
}

enum CustomPending {
    Choice,
    Multi { selected: Vec<String>, slot: usize },
}

/// Walks a structured form one visible question at a time.
pub struct FormWalker {
    request: FormRequest,
    answers: Map<String, Value>,
    position: usize,
    answered_count: usize,
    custom: Option<CustomPending>,
}

impl FormWalker {
    pub fn new(request: FormRequest) -> Self {
        let mut walker = Self {
            request,
            answers: Map::new(),
            position: 0,
            answered_count: 0,
            custom: None,
        };
        walker.position = walker.next_visible_from(0);
        walker
    }

    pub fn request(&self) -> &FormRequest {
        &self.request
    }

    /// `None` once every visible question has been answered.
    pub fn current(&self) -> Option<&Question> {
        self.request.questions.get(self.position)
    }

    pub fn is_awaiting_custom(&self) -> bool {
        self.custom.is_some()
    }

    /// Options as shown to the user: the declared ones plus the free-text slot.
    pub fn display_options(&self) -> Vec<String> {
        match self.current() {
            Some(question)
                if matches!(question.kind, QuestionKind::Choice | QuestionKind::Multiselect) =>
            {
                let mut options = question.options().to_vec();
                options.push(CUSTOM_OPTION_LABEL.to_string());
                options
            }
            _ => Vec::new(),
        }
    }

    /// (number of the current question, visible questions known so far). The total can
    /// grow when an answer reveals a conditional question.
    pub fn progress(&self) -> (usize, usize) {
        let upcoming = self
            .request
            .questions
            .iter()
            .enumerate()
            .skip(self.position)
            .filter(|(index, question)| {
                *index == self.position || is_visible(question, &self.answers)
            })
            .count();
        let current = if self.current().is_some() {
            self.answered_count + 1
        } else {
            self.answered_count
        };
        (current, self.answered_count + upcoming)
    }

    pub fn choose(&mut self, index: usize) -> Result<Step, FormError> {
        let question = self.question_of_kind(&[QuestionKind::Choice])?;
        let options = question.options();
        if index == options.len() {
            self.custom = Some(CustomPending::Choice);
            return Ok(Step::AwaitingCustomText);
        }
        let value = options
            .get(index)
            .cloned()
            .ok_or(FormError::OptionOutOfRange(index))?;
        Ok(self.record(Value::String(value)))
    }

    /// Submits a multiselect answer. Indices may be unordered or repeated; the custom
    /// slot (index == option count) asks for free text first.
    pub fn choose_many(&mut self, indices: &[usize]) -> Result<Step, FormError> {
        let question = self.question_of_kind(&[QuestionKind::Multiselect])?;
        let options = question.options();
        let mut picked = indices.to_vec();
        picked.sort_unstable();
        picked.dedup();
        if let Some(bad) = picked.iter().find(|index| **index > options.len()) {
            return Err(FormError::OptionOutOfRange(*bad));
        }
        if picked.is_empty() && question.required {
            return Err(FormError::AnswerRequired(question.id.clone()));
        }
        let selected: Vec<String> = picked
            .iter()
            .map(|index| {
                options
                    .get(*index)
                    .cloned()
                    .unwrap_or_else(|| CUSTOM_OPTION_LABEL.to_string())
            })
            .collect();
        if let Some(slot) = picked.iter().position(|index| *index == options.len()) {
            self.custom = Some(CustomPending::Multi { selected, slot });
            return Ok(Step::AwaitingCustomText);
        }
        Ok(self.record(strings_to_value(selected)))
    }

    pub fn answer_yes_no(&mut self, yes: bool) -> Result<Step, FormError> {
        self.question_of_kind(&[QuestionKind::Yesno])?;
        Ok(self.record(Value::Bool(yes)))
    }

    /// Text for a `text` question, or the free-text value of a pending custom option.
    pub fn answer_text(&mut self, text: &str) -> Result<Step, FormError> {
        let text = text.trim();
        if let Some(custom) = self.custom.take() {
            let Some(question) = self.current() else {
                return Err(FormError::NoActiveQuestion);
            };
            if text.is_empty() {
                let id = question.id.clone();
                self.custom = Some(custom);
                return Err(FormError::AnswerRequired(id));
            }
            let value = match custom {
                CustomPending::Choice => Value::String(text.to_string()),
                CustomPending::Multi { mut selected, slot } => {
                    selected[slot] = text.to_string();
                    strings_to_value(selected)
                }
            };
            return Ok(self.record(value));
        }

        let question = self.question_of_kind(&[QuestionKind::Text])?;
        if text.is_empty() {
            if question.required {
                return Err(FormError::AnswerRequired(question.id.clone()));
            }
            return Ok(self.advance());
        }
        Ok(self.record(Value::String(text.to_string())))
    }

    /// Returns to the option list without recording anything.
    pub fn cancel_custom(&mut self) {
        self.custom = None;
    }

    /// Only possible when the request allows skipping.
    pub fn skip(&self) -> Option<FormOutcome> {
        self.request.allow_skip.then(|| FormOutcome {
            answers: Map::new(),
            skipped: true,
        })
    }

    /// Completes a form that has no visible question left to ask.
    pub fn finish(&self) -> Result<FormOutcome, FormError> {
        match self.current() {
            Some(question) => Err(FormError::AnswerRequired(question.id.clone())),
            None => Ok(self.outcome()),
        }
    }

    fn question_of_kind(&self, kinds: &[QuestionKind]) -> Result<&Question, FormError> {
        let question = self.current().ok_or(FormError::NoActiveQuestion)?;
        if kinds.contains(&question.kind) && self.custom.is_none() {
            Ok(question)
        } else {
            Err(FormError::WrongQuestionType)
        }
    }

    fn record(&mut self, value: Value) -> Step {
        if let Some(question) = self.request.questions.get(self.position) {
            self.answers.insert(question.id.clone(), value);
        }
        self.advance()
    }

    fn advance(&mut self) -> Step {
        self.custom = None;
        self.answered_count += 1;
        self.position = self.next_visible_from(self.position + 1);
        if self.current().is_some() {
            Step::Next
        } else {
            Step::Complete(self.outcome())
        }
    }

    fn next_visible_from(&self, start: usize) -> usize {
        self.request
            .questions
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, question)| is_visible(question, &self.answers))
            .map_or(self.request.questions.len(), |(index, _)| index)
    }

    fn outcome(&self) -> FormOutcome {
        FormOutcome {
            answers: self.answers.clone(),
            skipped: false,
        }
    }
}

fn strings_to_value(values: Vec<String>) -> Value {
    Value::Array(values.into_iter().map(Value::String).collect())
}

/// A question with `show_if` is shown only when the referenced question has a recorded
/// answer that satisfies the predicate. Unanswered or hidden references hide it.
pub fn is_visible(question: &Question, answers: &Map<String, Value>) -> bool {
    let Some(condition) = &question.show_if else {
        return true;
    };
    let Some(answer) = answers.get(&condition.question_id) else {
        return false;
    };
    if let Some(expected) = &condition.equals {
        if !answer_matches(answer, expected) {
            return false;
        }
    }
    if let Some(forbidden) = &condition.not_equals {
        if answer_matches(answer, forbidden) {
            return false;
        }
    }
    true
}

fn answer_matches(answer: &Value, expected: &Value) -> bool {
    answer == expected || matches!(answer, Value::Array(items) if items.contains(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::runtime::protocol::ShowIf;
    use serde_json::json;

    fn question(id: &str, kind: QuestionKind) -> Question {
        Question {
            id: id.to_string(),
            kind,
            question: format!("{id}?"),
            options: None,
            placeholder: None,
            hint: None,
            required: true,
            show_if: None,
            why: "test".to_string(),
        }
    }

    fn with_options(mut question: Question, options: &[&str]) -> Question {
        question.options = Some(options.iter().map(|o| o.to_string()).collect());
        question
    }

    fn shown_if(mut question: Question, id: &str, equals: Value) -> Question {
        question.show_if = Some(ShowIf {
            question_id: id.to_string(),
            equals: Some(equals),
            not_equals: None,
        });
        question
    }

    fn form(questions: Vec<Question>) -> FormRequest {
        FormRequest {
            tool_call_id: "call_1".to_string(),
            goal: "collect details".to_string(),
            title: None,
            questions,
            allow_skip: false,
        }
    }

    fn show_if_form() -> FormRequest {
        form(vec![
            question("a", QuestionKind::Yesno),
            shown_if(question("b", QuestionKind::Text), "a", json!(true)),
        ])
    }

    #[test]
    fn hidden_question_is_skipped_when_predicate_fails() {
        let mut walker = FormWalker::new(show_if_form());
        let Ok(Step::Complete(outcome)) = walker.answer_yes_no(false) else {
            panic!("form should complete after A=false");
        };
        assert_eq!(outcome.answers.len(), 1);
        assert_eq!(outcome.answers.get("a"), Some(&json!(false)));
        assert!(!outcome.skipped);
    }

    #[test]
    fn revealed_question_must_be_answered() {
        let mut walker = FormWalker::new(show_if_form());
        assert_eq!(walker.answer_yes_no(true), Ok(Step::Next));
        assert_eq!(walker.current().map(|q| q.id.as_str()), Some("b"));
        assert_eq!(
            walker.answer_text("   "),
            Err(FormError::AnswerRequired("b".to_string()))
        );
        let Ok(Step::Complete(outcome)) = walker.answer_text("details") else {
            panic!("form should complete");
        };
        assert_eq!(outcome.answers.get("b"), Some(&json!("details")));
    }

    #[test]
    fn unanswered_or_hidden_reference_hides_question() {
        let request = form(vec![
            shown_if(question("first", QuestionKind::Text), "later", json!("x")),
            question("later", QuestionKind::Text),
            shown_if(question("chained", QuestionKind::Text), "first", json!("y")),
        ]);
        let mut walker = FormWalker::new(request);
        assert_eq!(walker.current().map(|q| q.id.as_str()), Some("later"));
        let Ok(Step::Complete(outcome)) = walker.answer_text("x") else {
            panic!("chained question depends on a hidden one and must stay hidden");
        };
        assert_eq!(outcome.answers.keys().collect::<Vec<_>>(), vec!["later"]);
    }

    #[test]
    fn not_equals_and_array_membership() {
        let mut answers = Map::new();
        answers.insert("tags".to_string(), json!(["work", "home"]));
        let mut q = question("q", QuestionKind::Text);
        q.show_if = Some(ShowIf {
            question_id: "tags".to_string(),
            equals: Some(json!("home")),
            not_equals: None,
        });
        assert!(is_visible(&q, &answers));
        q.show_if = Some(ShowIf {
            question_id: "tags".to_string(),
            equals: None,
            not_equals: Some(json!("work")),
        });
        assert!(!is_visible(&q, &answers));
        q.show_if = Some(ShowIf {
            question_id: "tags".to_string(),
            equals: None,
            not_equals: None,
        });
        assert!(is_visible(&q, &answers));
    }

    #[test]
    fn choice_custom_option_records_free_text() {
        let mut walker = FormWalker::new(form(vec![with_options(
            question("city", QuestionKind::Choice),
            &["Oslo", "Lima"],
        )]));
        assert_eq!(
            walker.display_options(),
            vec!["Oslo", "Lima", CUSTOM_OPTION_LABEL]
        );
        assert_eq!(walker.choose(3), Err(FormError::OptionOutOfRange(3)));
        assert_eq!(walker.choose(2), Ok(Step::AwaitingCustomText));
        assert!(walker.is_awaiting_custom());
        assert_eq!(
            walker.answer_text(""),
            Err(FormError::AnswerRequired("city".to_string()))
        );
        assert!(walker.is_awaiting_custom());
        let Ok(Step::Complete(outcome)) = walker.answer_text("Quito") else {
            panic!("expected completion");
        };
        assert_eq!(outcome.answers.get("city"), Some(&json!("Quito")));
    }

    #[test]
    fn multiselect_custom_text_replaces_only_its_slot() {
        let mut walker = FormWalker::new(form(vec![with_options(
            question("tools", QuestionKind::Multiselect),
            &["mail", "calendar", "weather"],
        )]));
        assert_eq!(walker.choose_many(&[3, 0, 2, 0]), Ok(Step::AwaitingCustomText));
        let Ok(Step::Complete(outcome)) = walker.answer_text("notion") else {
            panic!("expected completion");
        };
        assert_eq!(
            outcome.answers.get("tools"),
            Some(&json!(["mail", "weather", "notion"]))
        );
    }

    #[test]
    fn cancel_custom_returns_to_options() {
        let mut walker = FormWalker::new(form(vec![with_options(
            question("city", QuestionKind::Choice),
            &["Oslo"],
        )]));
        walker.choose(1).expect("custom slot");
        walker.cancel_custom();
        assert!(!walker.is_awaiting_custom());
        assert!(matches!(walker.choose(0), Ok(Step::Complete(_))));
    }

    #[test]
    fn required_multiselect_needs_a_selection() {
        let mut walker = FormWalker::new(form(vec![with_options(
            question("tools", QuestionKind::Multiselect),
            &["mail"],
        )]));
        assert_eq!(
            walker.choose_many(&[]),
            Err(FormError::AnswerRequired("tools".to_string()))
        );
    }

    #[test]
    fn optional_empty_text_is_omitted() {
        let mut notes = question("notes", QuestionKind::Text);
        notes.required = false;
        let mut walker = FormWalker::new(form(vec![notes, question("ok", QuestionKind::Yesno)]));
        assert_eq!(walker.answer_text(""), Ok(Step::Next));
        let Ok(Step::Complete(outcome)) = walker.answer_yes_no(true) else {
            panic!("expected completion");
        };
        assert!(!outcome.answers.contains_key("notes"));
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let mut walker = FormWalker::new(form(vec![question("ok", QuestionKind::Yesno)]));
        assert_eq!(walker.answer_text("yes"), Err(FormError::WrongQuestionType));
        assert_eq!(walker.choose(0), Err(FormError::WrongQuestionType));
    }

    #[test]
    fn skip_requires_allow_skip() {
        let mut request = show_if_form();
        assert!(FormWalker::new(request.clone()).skip().is_none());
        request.allow_skip = true;
        let mut walker = FormWalker::new(request);
        walker.answer_yes_no(true).expect("answer");
        let outcome = walker.skip().expect("skip allowed");
        assert!(outcome.skipped);
        assert!(outcome.answers.is_empty());
    }

    #[test]
    fn empty_form_finishes_with_no_answers() {
        let walker = FormWalker::new(form(Vec::new()));
        assert!(walker.current().is_none());
        assert_eq!(walker.progress(), (0, 0));
        let outcome = walker.finish().expect("nothing to ask");
        assert!(outcome.answers.is_empty());
        assert!(!outcome.skipped);
    }

    #[test]
    fn progress_counts_visible_questions() {
        let mut walker = FormWalker::new(show_if_form());
        assert_eq!(walker.progress(), (1, 1));
        walker.answer_yes_no(true).expect("answer");
        assert_eq!(walker.progress(), (2, 2));
    }
}
