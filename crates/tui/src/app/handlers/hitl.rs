use super::command::report_session_error;
use super::{handle_input_edit_key, LoopAction};
use crate::app::runtime::protocol::{BootstrapMethod, QuestionKind};
use crate::app::runtime::MessageSink;
use crate::app::state::hitl::{BootstrapAnswer, PendingRequest, Step};
use crate::app::state::DiagnosticLevel;
use crate::app::AppState;
use crossterm::event::{KeyCode, KeyModifiers};

/// What the pending form is waiting for, copied out so the walker borrow can end.
enum FormFocus {
    Empty { allow_skip: bool },
    CustomText,
    Question { kind: QuestionKind, option_count: usize, allow_skip: bool },
}

fn digit_index(key: KeyCode) -> Option<usize> {
    match key {
        KeyCode::Char(ch @ '1'..='9') => ch.to_digit(10).map(|digit| digit as usize - 1),
        _ => None,
    }
}

/// Routes keys while a `user_input_required` request is pending. `None` when nothing is
/// pending and the composer should handle the key.
pub(crate) fn handle_hitl_key(
    app: &mut AppState,
    key: KeyCode,
    modifiers: KeyModifiers,
    sink: &mut dyn MessageSink,
) -> Option<LoopAction> {
    let action = match app.session.hitl().pending()? {
        PendingRequest::Bootstrap(request) => {
            let method = request.method;
            let options = request.options().to_vec();
            handle_bootstrap_key(app, method, &options, key, modifiers, sink)
        }
        PendingRequest::Form(_) => handle_form_key(app, key, modifiers, sink),
    };
    Some(action)
}

fn send_bootstrap(app: &mut AppState, sink: &mut dyn MessageSink, answer: BootstrapAnswer) {
    match app.session.submit_answer(sink, answer) {
        Ok(()) => app.reset_hitl_ui(),
        Err(error) => report_session_error(app, &error),
    }
}

fn handle_bootstrap_key(
    app: &mut AppState,
    method: BootstrapMethod,
    options: &[String],
    key: KeyCode,
    modifiers: KeyModifiers,
    sink: &mut dyn MessageSink,
) -> LoopAction {
    match method {
        BootstrapMethod::Confirm => match key {
            KeyCode::Char('y' | 'Y') => send_bootstrap(app, sink, BootstrapAnswer::Confirm(true)),
            KeyCode::Char('n' | 'N') | KeyCode::Esc => {
                send_bootstrap(app, sink, BootstrapAnswer::Confirm(false))
            }
            KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down | KeyCode::Tab => {
                app.hitl_cursor.move_by(1, 2);
            }
            KeyCode::Enter => {
                let yes = app.hitl_cursor.selected == 0;
                send_bootstrap(app, sink, BootstrapAnswer::Confirm(yes));
            }
            _ => return LoopAction::Ignored,
        },
        BootstrapMethod::Select => match key {
            KeyCode::Up => app.hitl_cursor.move_by(-1, options.len()),
            KeyCode::Down => app.hitl_cursor.move_by(1, options.len()),
            KeyCode::Esc => send_bootstrap(app, sink, BootstrapAnswer::Cancel),
            KeyCode::Enter => {
                let Some(choice) = options.get(app.hitl_cursor.selected) else {
                    return LoopAction::Ignored;
                };
                send_bootstrap(app, sink, BootstrapAnswer::Select(choice.clone()));
            }
            other => {
                let Some(choice) = digit_index(other).and_then(|index| options.get(index)) else {
                    return LoopAction::Ignored;
                };
                send_bootstrap(app, sink, BootstrapAnswer::Select(choice.clone()));
            }
        },
        BootstrapMethod::Text => match key {
            KeyCode::Esc => send_bootstrap(app, sink, BootstrapAnswer::Cancel),
            KeyCode::Enter => {
                let text = app.answer_input.current();
                send_bootstrap(app, sink, BootstrapAnswer::Text(text));
            }
            _ => {
                return handle_input_edit_key(&mut app.answer_input, key, modifiers, false)
                    .map_or(LoopAction::Ignored, LoopAction::from_redraw);
            }
        },
    }
    LoopAction::Redraw
}

fn form_focus(app: &mut AppState) -> Option<FormFocus> {
    let walker = app.session.hitl_mut().form_mut()?;
    let allow_skip = walker.request().allow_skip;
    if walker.is_awaiting_custom() {
        return Some(FormFocus::CustomText);
    }
    let option_count = walker.display_options().len();
    Some(match walker.current() {
        None => FormFocus::Empty { allow_skip },
        Some(question) => FormFocus::Question {
            kind: question.kind,
            option_count,
            allow_skip,
        },
    })
}

fn handle_form_key(
    app: &mut AppState,
    key: KeyCode,
    modifiers: KeyModifiers,
    sink: &mut dyn MessageSink,
) -> LoopAction {
    let Some(focus) = form_focus(app) else {
        return LoopAction::Ignored;
    };

    let step = match focus {
        FormFocus::Empty { allow_skip } => match key {
            KeyCode::Enter => {
                let outcome = app
                    .session
                    .hitl_mut()
                    .form_mut()
                    .map(|walker| walker.finish());
                match outcome {
                    Some(Ok(outcome)) => Ok(Step::Complete(outcome)),
                    Some(Err(error)) => Err(error),
                    None => return LoopAction::Ignored,
                }
            }
            KeyCode::Esc if allow_skip => return skip_form(app, sink),
            _ => return LoopAction::Ignored,
        },
        FormFocus::CustomText => match key {
            KeyCode::Esc => {
                if let Some(walker) = app.session.hitl_mut().form_mut() {
                    walker.cancel_custom();
                }
                app.answer_input.clear();
                return LoopAction::Redraw;
            }
            KeyCode::Enter => {
                let text = app.answer_input.current();
                match app.session.hitl_mut().form_mut() {
                    Some(walker) => walker.answer_text(&text),
                    None => return LoopAction::Ignored,
                }
            }
            _ => {
                return handle_input_edit_key(&mut app.answer_input, key, modifiers, false)
                    .map_or(LoopAction::Ignored, LoopAction::from_redraw);
            }
        },
        FormFocus::Question {
            kind,
            option_count,
            allow_skip,
        } => {
            if key == KeyCode::Esc {
                return if allow_skip {
                    skip_form(app, sink)
                } else {
                    LoopAction::Ignored
                };
            }
            match question_key(app, kind, option_count, key, modifiers) {
                QuestionInput::Handled(action) => return action,
                QuestionInput::Submit(submit) => {
                    let cursor = &app.hitl_cursor;
                    let selected = cursor.selected;
                    let toggled: Vec<usize> = cursor.toggled.iter().copied().collect();
                    let text = app.answer_input.current();
                    let Some(walker) = app.session.hitl_mut().form_mut() else {
                        return LoopAction::Ignored;
                    };
                    match submit {
                        Submit::Choice(index) => walker.choose(index.unwrap_or(selected)),
                        Submit::Multi => walker.choose_many(&toggled),
                        Submit::YesNo(yes) => walker.answer_yes_no(yes),
                        Submit::Text => walker.answer_text(&text),
                    }
                }
            }
        }
    };

    match step {
        Ok(Step::Next) => app.reset_hitl_ui(),
        Ok(Step::AwaitingCustomText) => app.answer_input.clear(),
        Ok(Step::Complete(outcome)) => match app.session.submit_form(sink, outcome) {
            Ok(()) => app.reset_hitl_ui(),
            Err(error) => report_session_error(app, &error),
        },
        Err(error) => app.push_diagnostic(DiagnosticLevel::Warn, error.to_string()),
    }
    LoopAction::Redraw
}

enum Submit {
    Choice(Option<usize>),
    Multi,
    YesNo(bool),
    Text,
}

enum QuestionInput {
    Handled(LoopAction),
    Submit(Submit),
}

fn question_key(
    app: &mut AppState,
    kind: QuestionKind,
    option_count: usize,
    key: KeyCode,
    modifiers: KeyModifiers,
) -> QuestionInput {
    let cursor = &mut app.hitl_cursor;
    match kind {
        QuestionKind::Choice => match key {
            KeyCode::Up => cursor.move_by(-1, option_count),
            KeyCode::Down => cursor.move_by(1, option_count),
            KeyCode::Enter => return QuestionInput::Submit(Submit::Choice(None)),
            other => match digit_index(other).filter(|index| *index < option_count) {
                Some(index) => return QuestionInput::Submit(Submit::Choice(Some(index))),
                None => return QuestionInput::Handled(LoopAction::Ignored),
            },
        },
        QuestionKind::Multiselect => match key {
            KeyCode::Up => cursor.move_by(-1, option_count),
            KeyCode::Down => cursor.move_by(1, option_count),
            KeyCode::Char(' ') => {
                let selected = cursor.selected;
                cursor.toggle(selected);
            }
            KeyCode::Enter => return QuestionInput::Submit(Submit::Multi),
            other => match digit_index(other).filter(|index| *index < option_count) {
                Some(index) => cursor.toggle(index),
                None => return QuestionInput::Handled(LoopAction::Ignored),
            },
        },
        QuestionKind::Yesno => match key {
            KeyCode::Char('y' | 'Y') => return QuestionInput::Submit(Submit::YesNo(true)),
            KeyCode::Char('n' | 'N') => return QuestionInput::Submit(Submit::YesNo(false)),
            KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down | KeyCode::Tab => {
                cursor.move_by(1, 2);
            }
            KeyCode::Enter => {
                return QuestionInput::Submit(Submit::YesNo(cursor.selected == 0));
            }
            _ => return QuestionInput::Handled(LoopAction::Ignored),
        },
        QuestionKind::Text => {
            if key == KeyCode::Enter {
                return QuestionInput::Submit(Submit::Text);
            }
            let action = handle_input_edit_key(&mut app.answer_input, key, modifiers, false)
                .map_or(LoopAction::Ignored, LoopAction::from_redraw);
            return QuestionInput::Handled(action);
        }
    }
    QuestionInput::Handled(LoopAction::Redraw)
}

fn skip_form(app: &mut AppState, sink: &mut dyn MessageSink) -> LoopAction {
    match app.session.skip_form(sink) {
        Ok(()) => {
            app.reset_hitl_ui();
            app.push_diagnostic(DiagnosticLevel::Info, "form skipped");
        }
        Err(error) => report_session_error(app, &error),
    }
    LoopAction::Redraw
}
