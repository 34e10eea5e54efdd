use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Essay,
    FillInBlank,
    Matching,
    Ordering,
}

impl QuestionType {
    pub const ALL: [QuestionType; 7] = [
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::ShortAnswer,
        QuestionType::Essay,
        QuestionType::FillInBlank,
        QuestionType::Matching,
        QuestionType::Ordering,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "MULTIPLE_CHOICE",
            QuestionType::TrueFalse => "TRUE_FALSE",
            QuestionType::ShortAnswer => "SHORT_ANSWER",
            QuestionType::Essay => "ESSAY",
            QuestionType::FillInBlank => "FILL_IN_BLANK",
            QuestionType::Matching => "MATCHING",
            QuestionType::Ordering => "ORDERING",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrectnessMode {
    #[default]
    SingleAnswer,
    MultipleAnswers,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MultipleChoiceData {
    pub options: Vec<String>,
    pub correctness_mode: CorrectnessMode,
    pub correct_answers: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TrueFalseData {
    pub correct_answers: Vec<bool>,
}

/// Accepted answers for short-answer and essay questions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnswerListData {
    pub correct_answers: Vec<String>,
}

/// Blanked word positions into `tokenize(body)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FillInBlankData {
    pub correct_answers: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MatchingData {
    pub left_options: Vec<String>,
    pub right_options: Vec<String>,
    /// Left index -> right index. Partial.
    pub correct_answers: BTreeMap<usize, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderingData {
    pub options: Vec<String>,
    pub correct_answers: Vec<usize>,
}

/// Type-specific payload. Serialized without a tag: the question's `type`
/// field decides which shape is read back (see `QuestionData::from_value`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QuestionData {
    MultipleChoice(MultipleChoiceData),
    TrueFalse(TrueFalseData),
    ShortAnswer(AnswerListData),
    Essay(AnswerListData),
    FillInBlank(FillInBlankData),
    Matching(MatchingData),
    Ordering(OrderingData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

const DATA_PATH: &str = "questionData";

fn parse_shape<T: DeserializeOwned>(value: &serde_json::Value) -> Result<T, Vec<ValidationError>> {
    serde_json::from_value(value.clone())
        .map_err(|e| vec![ValidationError::new(DATA_PATH, e.to_string())])
}

pub fn default_data_for(question_type: QuestionType) -> QuestionData {
    match question_type {
        QuestionType::MultipleChoice => QuestionData::MultipleChoice(MultipleChoiceData::default()),
        QuestionType::TrueFalse => QuestionData::TrueFalse(TrueFalseData::default()),
        QuestionType::ShortAnswer => QuestionData::ShortAnswer(AnswerListData::default()),
        QuestionType::Essay => QuestionData::Essay(AnswerListData::default()),
        QuestionType::FillInBlank => QuestionData::FillInBlank(FillInBlankData::default()),
        QuestionType::Matching => QuestionData::Matching(MatchingData::default()),
        QuestionType::Ordering => QuestionData::Ordering(OrderingData::default()),
    }
}

/// Splits a question body into words on whitespace runs. The position of a
/// word in the result is its word index.
pub fn tokenize(body: &str) -> Vec<&str> {
    body.split_whitespace().collect()
}

impl QuestionData {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionData::MultipleChoice(_) => QuestionType::MultipleChoice,
            QuestionData::TrueFalse(_) => QuestionType::TrueFalse,
            QuestionData::ShortAnswer(_) => QuestionType::ShortAnswer,
            QuestionData::Essay(_) => QuestionType::Essay,
            QuestionData::FillInBlank(_) => QuestionType::FillInBlank,
            QuestionData::Matching(_) => QuestionType::Matching,
            QuestionData::Ordering(_) => QuestionType::Ordering,
        }
    }

    /// Reads a payload in the shape `question_type` dictates. A payload that
    /// belongs to another type fails here.
    pub fn from_value(
        question_type: QuestionType,
        value: &serde_json::Value,
    ) -> Result<Self, Vec<ValidationError>> {
        Ok(match question_type {
            QuestionType::MultipleChoice => QuestionData::MultipleChoice(parse_shape(value)?),
            QuestionType::TrueFalse => QuestionData::TrueFalse(parse_shape(value)?),
            QuestionType::ShortAnswer => QuestionData::ShortAnswer(parse_shape(value)?),
            QuestionType::Essay => QuestionData::Essay(parse_shape(value)?),
            QuestionType::FillInBlank => QuestionData::FillInBlank(parse_shape(value)?),
            QuestionType::Matching => QuestionData::Matching(parse_shape(value)?),
            QuestionType::Ordering => QuestionData::Ordering(parse_shape(value)?),
        })
    }

    /// Structural rules that hold regardless of the question body.
    pub fn check(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        match self {
            QuestionData::MultipleChoice(d) => {
                check_options(&mut errors, "options", &d.options);
                check_indices(&mut errors, "correctAnswers", &d.correct_answers, d.options.len());
                if d.correctness_mode == CorrectnessMode::SingleAnswer && d.correct_answers.len() > 1 {
                    errors.push(ValidationError::new(
                        format!("{DATA_PATH}.correctAnswers"),
                        "single-answer questions take at most one correct answer",
                    ));
                }
            }
            QuestionData::TrueFalse(d) => {
                if d.correct_answers.len() > 1 {
                    errors.push(ValidationError::new(
                        format!("{DATA_PATH}.correctAnswers"),
                        "true/false questions take at most one correct answer",
                    ));
                }
            }
            QuestionData::ShortAnswer(d) | QuestionData::Essay(d) => {
                check_options(&mut errors, "correctAnswers", &d.correct_answers);
            }
            QuestionData::FillInBlank(d) => {
                check_duplicates(&mut errors, "correctAnswers", &d.correct_answers);
            }
            QuestionData::Matching(d) => {
                check_options(&mut errors, "leftOptions", &d.left_options);
                check_options(&mut errors, "rightOptions", &d.right_options);
                for (left, right) in &d.correct_answers {
                    if *left >= d.left_options.len() {
                        errors.push(ValidationError::new(
                            format!("{DATA_PATH}.correctAnswers.{left}"),
                            format!("left option {left} does not exist"),
                        ));
                    }
                    if *right >= d.right_options.len() {
                        errors.push(ValidationError::new(
                            format!("{DATA_PATH}.correctAnswers.{left}"),
                            format!("right option {right} does not exist"),
                        ));
                    }
                }
            }
            QuestionData::Ordering(d) => {
                check_options(&mut errors, "options", &d.options);
                check_indices(&mut errors, "correctAnswers", &d.correct_answers, d.options.len());
            }
        }
        errors
    }

    /// Rules that depend on the question body (fill-in-blank positions).
    pub fn check_against_body(&self, body: &str) -> Vec<ValidationError> {
        let QuestionData::FillInBlank(d) = self else {
            return Vec::new();
        };
        let token_count = tokenize(body).len();
        d.correct_answers
            .iter()
            .filter(|i| **i >= token_count)
            .map(|i| {
                ValidationError::new(
                    format!("{DATA_PATH}.correctAnswers"),
                    format!("word {i} is past the end of the question ({token_count} words)"),
                )
            })
            .collect()
    }
}

fn check_options(errors: &mut Vec<ValidationError>, field: &str, options: &[String]) {
    for (i, option) in options.iter().enumerate() {
        if option.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("{DATA_PATH}.{field}.{i}"),
                "must not be empty",
            ));
        }
    }
}

fn check_duplicates(errors: &mut Vec<ValidationError>, field: &str, indices: &[usize]) {
    let mut seen = HashSet::new();
    for i in indices {
        if !seen.insert(*i) {
            errors.push(ValidationError::new(
                format!("{DATA_PATH}.{field}"),
                format!("index {i} is listed more than once"),
            ));
        }
    }
}

fn check_indices(errors: &mut Vec<ValidationError>, field: &str, indices: &[usize], len: usize) {
    for i in indices {
        if *i >= len {
            errors.push(ValidationError::new(
                format!("{DATA_PATH}.{field}"),
                format!("option {i} does not exist ({len} options)"),
            ));
        }
    }
    check_duplicates(errors, field, indices);
}

/// Parses and checks a payload for `question_type`. Invalid data is reported,
/// never repaired.
pub fn validate(
    question_type: QuestionType,
    value: &serde_json::Value,
) -> Result<QuestionData, Vec<ValidationError>> {
    let data = QuestionData::from_value(question_type, value)?;
    let errors = data.check();
    if errors.is_empty() {
        Ok(data)
    } else {
        Err(errors)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub body: String,
    pub difficulty: Difficulty,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question_data: QuestionData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    #[serde(default)]
    id: Option<String>,
    #[serde(alias = "question")]
    body: String,
    #[serde(default)]
    difficulty: Difficulty,
    #[serde(rename = "type")]
    question_type: QuestionType,
    question_data: serde_json::Value,
}

impl Question {
    pub fn blank(question_type: QuestionType) -> Self {
        Question {
            id: None,
            body: String::new(),
            difficulty: Difficulty::default(),
            question_type,
            question_data: default_data_for(question_type),
        }
    }

    /// Reads a question as the API returns it; the payload must match `type`.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, Vec<ValidationError>> {
        let raw: RawQuestion = serde_json::from_value(value.clone())
            .map_err(|e| vec![ValidationError::new("question", e.to_string())])?;
        let question_data = QuestionData::from_value(raw.question_type, &raw.question_data)?;
        Ok(Question {
            id: raw.id,
            body: raw.body,
            difficulty: raw.difficulty,
            question_type: raw.question_type,
            question_data,
        })
    }

    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.body.trim().is_empty() {
            errors.push(ValidationError::new("body", "question text is required"));
        }
        if self.question_data.question_type() != self.question_type {
            errors.push(ValidationError::new(
                DATA_PATH,
                format!(
                    "payload is {} but question type is {}",
                    self.question_data.question_type(),
                    self.question_type
                ),
            ));
            return errors;
        }
        errors.extend(self.question_data.check());
        errors.extend(self.question_data.check_against_body(&self.body));
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_validate_for_every_type() {
        for t in QuestionType::ALL {
            let value = serde_json::to_value(default_data_for(t)).expect("serialize default");
            let data = validate(t, &value).expect("default must be valid");
            assert_eq!(data.question_type(), t);
        }
    }

    #[test]
    fn default_shapes_serialize_as_expected() {
        assert_eq!(
            serde_json::to_value(default_data_for(QuestionType::TrueFalse)).expect("json"),
            json!({ "correctAnswers": [] })
        );
        assert_eq!(
            serde_json::to_value(default_data_for(QuestionType::MultipleChoice)).expect("json"),
            json!({ "options": [], "correctnessMode": "SINGLE_ANSWER", "correctAnswers": [] })
        );
        assert_eq!(
            serde_json::to_value(default_data_for(QuestionType::Matching)).expect("json"),
            json!({ "leftOptions": [], "rightOptions": [], "correctAnswers": {} })
        );
    }

    #[test]
    fn payload_of_another_type_is_rejected() {
        let mc = json!({ "options": ["a", "b"], "correctnessMode": "SINGLE_ANSWER", "correctAnswers": [0] });
        let errors = validate(QuestionType::Ordering, &mc).expect_err("shape mismatch");
        assert_eq!(errors[0].path, "questionData");
        assert!(validate(QuestionType::TrueFalse, &mc).is_err());
    }

    #[test]
    fn multiple_choice_rules() {
        let bad = json!({
            "options": ["a", " ", "c"],
            "correctnessMode": "SINGLE_ANSWER",
            "correctAnswers": [0, 5]
        });
        let errors = validate(QuestionType::MultipleChoice, &bad).expect_err("invalid");
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"questionData.options.1"));
        assert!(paths.contains(&"questionData.correctAnswers"));
        assert_eq!(errors.len(), 3);

        let ok = json!({
            "options": ["a", "b", "c"],
            "correctnessMode": "MULTIPLE_ANSWERS",
            "correctAnswers": [0, 2]
        });
        assert!(validate(QuestionType::MultipleChoice, &ok).is_ok());
    }

    #[test]
    fn matching_map_round_trips_with_string_keys() {
        let v = json!({
            "leftOptions": ["dog", "cat"],
            "rightOptions": ["woof", "meow"],
            "correctAnswers": { "0": 0, "1": 1 }
        });
        let data = validate(QuestionType::Matching, &v).expect("valid");
        assert_eq!(serde_json::to_value(&data).expect("json"), v);

        let dangling = json!({
            "leftOptions": ["dog"],
            "rightOptions": ["woof"],
            "correctAnswers": { "0": 3 }
        });
        let errors = validate(QuestionType::Matching, &dangling).expect_err("dangling");
        assert_eq!(errors[0].path, "questionData.correctAnswers.0");
    }

    #[test]
    fn true_false_takes_single_value() {
        let v = json!({ "correctAnswers": [true, false] });
        assert!(validate(QuestionType::TrueFalse, &v).is_err());
        assert!(validate(QuestionType::TrueFalse, &json!({ "correctAnswers": [false] })).is_ok());
    }

    #[test]
    fn tokenize_discards_empty_tokens() {
        assert_eq!(tokenize("  the  quick\tbrown\n fox "), vec!["the", "quick", "brown", "fox"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn fill_in_blank_checked_against_body() {
        let q = Question {
            id: None,
            body: "the quick".to_string(),
            difficulty: Difficulty::Easy,
            question_type: QuestionType::FillInBlank,
            question_data: QuestionData::FillInBlank(FillInBlankData {
                correct_answers: vec![1, 3],
            }),
        };
        let errors = q.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "questionData.correctAnswers");
    }

    #[test]
    fn question_accepts_question_alias_for_body() {
        let q = Question::from_value(&json!({
            "id": "q1",
            "question": "Is water wet?",
            "difficulty": "EASY",
            "type": "TRUE_FALSE",
            "questionData": { "correctAnswers": [true] }
        }))
        .expect("parse");
        assert_eq!(q.body, "Is water wet?");
        assert!(q.validate().is_empty());
    }
}
