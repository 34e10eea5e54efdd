use crate::draft::{EditOp, QuestionDraft};
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_required_str, get_typed, respond};
use crate::ipc::types::{AppState, Request};
use crate::question::{
    default_data_for, tokenize, validate, CorrectnessMode, Difficulty, Question, QuestionType,
};
use serde_json::json;
use uuid::Uuid;

fn question_types() -> serde_json::Value {
    json!({
        "types": QuestionType::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
        "difficulties": [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard],
        "correctnessModes": [CorrectnessMode::SingleAnswer, CorrectnessMode::MultipleAnswers],
    })
}

fn question_default_data(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let question_type: QuestionType = get_typed(params, "type")?;
    Ok(json!({ "questionData": default_data_for(question_type) }))
}

fn question_validate(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let question_type: QuestionType = get_typed(params, "type")?;
    let raw = params
        .get("questionData")
        .ok_or_else(|| HandlerErr::bad_params("missing questionData"))?;
    let data = validate(question_type, raw)?;
    if let Some(body) = params.get("body").and_then(|v| v.as_str()) {
        let errors = data.check_against_body(body);
        if !errors.is_empty() {
            return Err(errors.into());
        }
    }
    Ok(json!({ "questionData": data }))
}

fn question_tokenize(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let body = get_required_str(params, "body")?;
    Ok(json!({ "tokens": tokenize(&body) }))
}

fn draft_mut<'a>(state: &'a mut AppState, draft_id: &str) -> Result<&'a mut QuestionDraft, HandlerErr> {
    state
        .drafts
        .get_mut(draft_id)
        .ok_or_else(|| HandlerErr::not_found("draft not found", json!({ "draftId": draft_id })))
}

fn draft_view(draft: &QuestionDraft) -> Result<serde_json::Value, HandlerErr> {
    draft.snapshot().map_err(HandlerErr::serialize_failed)
}

fn question_draft_open(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let draft = match params.get("question") {
        Some(v) if !v.is_null() => QuestionDraft::from_question(Question::from_value(v)?)?,
        _ => {
            let mut draft = QuestionDraft::default();
            if let Some(v) = params.get("type").filter(|v| !v.is_null()) {
                let question_type: QuestionType = serde_json::from_value(v.clone())
                    .map_err(|e| HandlerErr::bad_params(format!("invalid type: {}", e)))?;
                draft.apply(EditOp::SetType { question_type })?;
            }
            draft
        }
    };
    let draft_id = Uuid::new_v4().to_string();
    let snapshot = draft_view(&draft)?;
    tracing::debug!(
        draft = %draft_id,
        question_type = %draft.question().question_type,
        "question draft opened"
    );
    state.drafts.insert(draft_id.clone(), draft);
    Ok(json!({ "draftId": draft_id, "draft": snapshot }))
}

fn question_draft_get(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let draft_id = get_required_str(params, "draftId")?;
    let draft = draft_mut(state, &draft_id)?;
    Ok(json!({ "draft": draft_view(draft)? }))
}

fn question_draft_edit(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let draft_id = get_required_str(params, "draftId")?;
    let op: EditOp = serde_json::from_value(params.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid edit op: {}", e)))?;
    let draft = draft_mut(state, &draft_id)?;
    draft.apply(op)?;
    Ok(json!({ "draft": draft_view(draft)? }))
}

fn question_draft_submit(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let draft_id = get_required_str(params, "draftId")?;
    let draft = draft_mut(state, &draft_id)?;
    let question = draft.submit()?;
    Ok(json!({ "question": question }))
}

fn question_draft_close(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let draft_id = get_required_str(params, "draftId")?;
    let closed = state.drafts.remove(&draft_id).is_some();
    Ok(json!({ "closed": closed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "question.types" => Ok(question_types()),
        "question.defaultData" => question_default_data(&req.params),
        "question.validate" => question_validate(&req.params),
        "question.tokenize" => question_tokenize(&req.params),
        "question.draftOpen" => question_draft_open(state, &req.params),
        "question.draftGet" => question_draft_get(state, &req.params),
        "question.draftEdit" => question_draft_edit(state, &req.params),
        "question.draftSubmit" => question_draft_submit(state, &req.params),
        "question.draftClose" => question_draft_close(state, &req.params),
        _ => return None,
    };
    Some(respond(req, result))
}
