//! Editable question view-model.
//!
//! A `QuestionDraft` is what the question dialog edits. It always holds a
//! payload whose shape matches the question type; every edit keeps the
//! index-based answer references pointing at the same options they pointed
//! at before the edit.

use crate::question::{
    default_data_for, tokenize, CorrectnessMode, Difficulty, Question, QuestionData,
    QuestionType, ValidationError,
};
use serde::Deserialize;
use serde_json::json;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum EditOp {
    SetType {
        #[serde(rename = "type")]
        question_type: QuestionType,
    },
    SetBody {
        body: String,
    },
    SetDifficulty {
        difficulty: Difficulty,
    },
    ToggleBlank {
        index: usize,
    },
    SetCorrectnessMode {
        mode: CorrectnessMode,
    },
    ToggleCorrect {
        index: usize,
    },
    AddOption {
        text: String,
    },
    UpdateOption {
        index: usize,
        text: String,
    },
    RemoveOption {
        index: usize,
    },
    MoveOption {
        from: usize,
        to: usize,
    },
    SetTrueFalse {
        value: Option<bool>,
    },
    SetCorrectOrder {
        indices: Vec<usize>,
    },
    AddAnswer {
        text: String,
    },
    UpdateAnswer {
        index: usize,
        text: String,
    },
    RemoveAnswer {
        index: usize,
    },
    AddPairOption {
        side: Side,
        text: String,
    },
    UpdatePairOption {
        side: Side,
        index: usize,
        text: String,
    },
    RemovePairOption {
        side: Side,
        index: usize,
    },
    MovePairOption {
        side: Side,
        from: usize,
        to: usize,
    },
    SetMatch {
        left: usize,
        right: Option<usize>,
    },
}

impl EditOp {
    fn name(&self) -> &'static str {
        match self {
            EditOp::SetType { .. } => "setType",
            EditOp::SetBody { .. } => "setBody",
            EditOp::SetDifficulty { .. } => "setDifficulty",
            EditOp::ToggleBlank { .. } => "toggleBlank",
            EditOp::SetCorrectnessMode { .. } => "setCorrectnessMode",
            EditOp::ToggleCorrect { .. } => "toggleCorrect",
            EditOp::AddOption { .. } => "addOption",
            EditOp::UpdateOption { .. } => "updateOption",
            EditOp::RemoveOption { .. } => "removeOption",
            EditOp::MoveOption { .. } => "moveOption",
            EditOp::SetTrueFalse { .. } => "setTrueFalse",
            EditOp::SetCorrectOrder { .. } => "setCorrectOrder",
            EditOp::AddAnswer { .. } => "addAnswer",
            EditOp::UpdateAnswer { .. } => "updateAnswer",
            EditOp::RemoveAnswer { .. } => "removeAnswer",
            EditOp::AddPairOption { .. } => "addPairOption",
            EditOp::UpdatePairOption { .. } => "updatePairOption",
            EditOp::RemovePairOption { .. } => "removePairOption",
            EditOp::MovePairOption { .. } => "movePairOption",
            EditOp::SetMatch { .. } => "setMatch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    WrongType {
        op: &'static str,
        question_type: QuestionType,
    },
    IndexOutOfRange {
        index: usize,
        len: usize,
    },
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::WrongType { op, question_type } => {
                write!(f, "{} does not apply to {} questions", op, question_type)
            }
            EditError::IndexOutOfRange { index, len } => {
                write!(f, "index {} out of range (len {})", index, len)
            }
        }
    }
}

impl std::error::Error for EditError {}

fn in_range(index: usize, len: usize) -> Result<(), EditError> {
    if index < len {
        Ok(())
    } else {
        Err(EditError::IndexOutOfRange { index, len })
    }
}

/// Where `i` ends up after the item at `from` is moved to `to`.
fn moved_index(i: usize, from: usize, to: usize) -> usize {
    if i == from {
        to
    } else if from < to && i > from && i <= to {
        i - 1
    } else if from > to && i >= to && i < from {
        i + 1
    } else {
        i
    }
}

/// Where `i` ends up after the item at `removed` is deleted.
fn removed_index(i: usize, removed: usize) -> Option<usize> {
    match i.cmp(&removed) {
        std::cmp::Ordering::Less => Some(i),
        std::cmp::Ordering::Equal => None,
        std::cmp::Ordering::Greater => Some(i - 1),
    }
}

fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<(), EditError> {
    in_range(from, items.len())?;
    in_range(to, items.len())?;
    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
}

fn remove_item<T>(items: &mut Vec<T>, index: usize) -> Result<(), EditError> {
    in_range(index, items.len())?;
    items.remove(index);
    Ok(())
}

fn update_item(items: &mut [String], index: usize, text: String) -> Result<(), EditError> {
    in_range(index, items.len())?;
    items[index] = text;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDraft {
    question: Question,
}

impl Default for QuestionDraft {
    fn default() -> Self {
        QuestionDraft {
            question: Question::blank(QuestionType::MultipleChoice),
        }
    }
}

impl QuestionDraft {
    /// Opens an existing question for editing. Refuses questions whose
    /// stored answers are already inconsistent with their body.
    pub fn from_question(question: Question) -> Result<Self, Vec<ValidationError>> {
        let errors = question.question_data.check_against_body(&question.body);
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(QuestionDraft { question })
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn apply(&mut self, op: EditOp) -> Result<(), EditError> {
        let name = op.name();
        let question_type = self.question.question_type;
        let wrong_type = || EditError::WrongType {
            op: name,
            question_type,
        };
        let q = &mut self.question;

        match op {
            EditOp::SetType { question_type } => {
                if question_type != q.question_type {
                    q.question_type = question_type;
                    q.question_data = default_data_for(question_type);
                }
            }
            EditOp::SetBody { body } => {
                q.body = body;
                if let QuestionData::FillInBlank(d) = &mut q.question_data {
                    let token_count = tokenize(&q.body).len();
                    d.correct_answers.retain(|i| *i < token_count);
                }
            }
            EditOp::SetDifficulty { difficulty } => q.difficulty = difficulty,
            EditOp::ToggleBlank { index } => {
                let QuestionData::FillInBlank(d) = &mut q.question_data else {
                    return Err(wrong_type());
                };
                in_range(index, tokenize(&q.body).len())?;
                if let Some(pos) = d.correct_answers.iter().position(|i| *i == index) {
                    d.correct_answers.remove(pos);
                } else {
                    d.correct_answers.push(index);
                    d.correct_answers.sort_unstable();
                }
            }
            EditOp::SetCorrectnessMode { mode } => {
                let QuestionData::MultipleChoice(d) = &mut q.question_data else {
                    return Err(wrong_type());
                };
                if mode == CorrectnessMode::SingleAnswer {
                    d.correct_answers.truncate(1);
                }
                d.correctness_mode = mode;
            }
            EditOp::ToggleCorrect { index } => {
                let QuestionData::MultipleChoice(d) = &mut q.question_data else {
                    return Err(wrong_type());
                };
                in_range(index, d.options.len())?;
                match d.correctness_mode {
                    CorrectnessMode::SingleAnswer => d.correct_answers = vec![index],
                    CorrectnessMode::MultipleAnswers => {
                        if let Some(pos) = d.correct_answers.iter().position(|i| *i == index) {
                            d.correct_answers.remove(pos);
                        } else {
                            d.correct_answers.push(index);
                        }
                    }
                }
            }
            EditOp::AddOption { text } => match &mut q.question_data {
                QuestionData::MultipleChoice(d) => d.options.push(text),
                QuestionData::Ordering(d) => d.options.push(text),
                _ => return Err(wrong_type()),
            },
            EditOp::UpdateOption { index, text } => match &mut q.question_data {
                QuestionData::MultipleChoice(d) => update_item(&mut d.options, index, text)?,
                QuestionData::Ordering(d) => update_item(&mut d.options, index, text)?,
                _ => return Err(wrong_type()),
            },
            EditOp::RemoveOption { index } => match &mut q.question_data {
                QuestionData::MultipleChoice(d) => {
                    remove_item(&mut d.options, index)?;
                    d.correct_answers = d
                        .correct_answers
                        .iter()
                        .filter_map(|i| removed_index(*i, index))
                        .collect();
                }
                QuestionData::Ordering(d) => {
                    remove_item(&mut d.options, index)?;
                    d.correct_answers = d
                        .correct_answers
                        .iter()
                        .filter_map(|i| removed_index(*i, index))
                        .collect();
                }
                _ => return Err(wrong_type()),
            },
            EditOp::MoveOption { from, to } => match &mut q.question_data {
                QuestionData::MultipleChoice(d) => {
                    move_item(&mut d.options, from, to)?;
                    for i in d.correct_answers.iter_mut() {
                        *i = moved_index(*i, from, to);
                    }
                }
                // The correct order is picked separately; moving options leaves it alone.
                QuestionData::Ordering(d) => move_item(&mut d.options, from, to)?,
                _ => return Err(wrong_type()),
            },
            EditOp::SetTrueFalse { value } => {
                let QuestionData::TrueFalse(d) = &mut q.question_data else {
                    return Err(wrong_type());
                };
                d.correct_answers = value.into_iter().collect();
            }
            EditOp::SetCorrectOrder { indices } => {
                let QuestionData::Ordering(d) = &mut q.question_data else {
                    return Err(wrong_type());
                };
                for i in &indices {
                    in_range(*i, d.options.len())?;
                }
                d.correct_answers = indices;
            }
            EditOp::AddAnswer { text } => match &mut q.question_data {
                QuestionData::ShortAnswer(d) | QuestionData::Essay(d) => {
                    d.correct_answers.push(text)
                }
                _ => return Err(wrong_type()),
            },
            EditOp::UpdateAnswer { index, text } => match &mut q.question_data {
                QuestionData::ShortAnswer(d) | QuestionData::Essay(d) => {
                    update_item(&mut d.correct_answers, index, text)?
                }
                _ => return Err(wrong_type()),
            },
            EditOp::RemoveAnswer { index } => match &mut q.question_data {
                QuestionData::ShortAnswer(d) | QuestionData::Essay(d) => {
                    remove_item(&mut d.correct_answers, index)?
                }
                _ => return Err(wrong_type()),
            },
            EditOp::AddPairOption { side, text } => {
                let QuestionData::Matching(d) = &mut q.question_data else {
                    return Err(wrong_type());
                };
                match side {
                    Side::Left => d.left_options.push(text),
                    Side::Right => d.right_options.push(text),
                }
            }
            EditOp::UpdatePairOption { side, index, text } => {
                let QuestionData::Matching(d) = &mut q.question_data else {
                    return Err(wrong_type());
                };
                match side {
                    Side::Left => update_item(&mut d.left_options, index, text)?,
                    Side::Right => update_item(&mut d.right_options, index, text)?,
                }
            }
            EditOp::RemovePairOption { side, index } => {
                let QuestionData::Matching(d) = &mut q.question_data else {
                    return Err(wrong_type());
                };
                match side {
                    Side::Left => {
                        remove_item(&mut d.left_options, index)?;
                        d.correct_answers = std::mem::take(&mut d.correct_answers)
                            .into_iter()
                            .filter_map(|(l, r)| removed_index(l, index).map(|l| (l, r)))
                            .collect();
                    }
                    Side::Right => {
                        remove_item(&mut d.right_options, index)?;
                        d.correct_answers = std::mem::take(&mut d.correct_answers)
                            .into_iter()
                            .filter_map(|(l, r)| removed_index(r, index).map(|r| (l, r)))
                            .collect();
                    }
                }
            }
            EditOp::MovePairOption { side, from, to } => {
                let QuestionData::Matching(d) = &mut q.question_data else {
                    return Err(wrong_type());
                };
                match side {
                    Side::Left => {
                        move_item(&mut d.left_options, from, to)?;
                        d.correct_answers = std::mem::take(&mut d.correct_answers)
                            .into_iter()
                            .map(|(l, r)| (moved_index(l, from, to), r))
                            .collect();
                    }
                    Side::Right => {
                        move_item(&mut d.right_options, from, to)?;
                        for r in d.correct_answers.values_mut() {
                            *r = moved_index(*r, from, to);
                        }
                    }
                }
            }
            EditOp::SetMatch { left, right } => {
                let QuestionData::Matching(d) = &mut q.question_data else {
                    return Err(wrong_type());
                };
                in_range(left, d.left_options.len())?;
                match right {
                    Some(r) => {
                        in_range(r, d.right_options.len())?;
                        d.correct_answers.insert(left, r);
                    }
                    None => {
                        d.correct_answers.remove(&left);
                    }
                }
            }
        }
        Ok(())
    }

    /// The payload to send to the create/update endpoint.
    pub fn submit(&self) -> Result<Question, Vec<ValidationError>> {
        let errors = self.question.validate();
        if errors.is_empty() {
            Ok(self.question.clone())
        } else {
            Err(errors)
        }
    }

    /// JSON view for the dialog. Fill-in-blank drafts also carry their
    /// tokenized body so the UI can render clickable words.
    pub fn snapshot(&self) -> serde_json::Result<serde_json::Value> {
        let mut out = serde_json::to_value(&self.question)?;
        if let (QuestionData::FillInBlank(d), Some(obj)) =
            (&self.question.question_data, out.as_object_mut())
        {
            let words: Vec<serde_json::Value> = tokenize(&self.question.body)
                .into_iter()
                .enumerate()
                .map(|(index, text)| {
                    json!({
                        "index": index,
                        "text": text,
                        "blank": d.correct_answers.contains(&index),
                    })
                })
                .collect();
            obj.insert("words".to_string(), json!(words));
        }
        Ok(out)
    }
}
