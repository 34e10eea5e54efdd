use crate::attendance::AttendanceError;
use crate::cache::CacheError;
use crate::draft::EditError;
use crate::question::ValidationError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

#[derive(Debug)]
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>, details: serde_json::Value) -> Self {
        HandlerErr {
            code: "not_found",
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn serialize_failed(e: serde_json::Error) -> Self {
        HandlerErr {
            code: "serialize_failed",
            message: e.to_string(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<AttendanceError> for HandlerErr {
    fn from(e: AttendanceError) -> Self {
        HandlerErr::bad_params(e.to_string())
    }
}

impl From<Vec<ValidationError>> for HandlerErr {
    fn from(errors: Vec<ValidationError>) -> Self {
        HandlerErr {
            code: "validation_failed",
            message: format!("{} field(s) failed validation", errors.len()),
            details: Some(json!({ "errors": errors })),
        }
    }
}

impl From<EditError> for HandlerErr {
    fn from(e: EditError) -> Self {
        let code = match e {
            EditError::WrongType { .. } => "wrong_question_type",
            EditError::IndexOutOfRange { .. } => "bad_params",
        };
        HandlerErr {
            code,
            message: e.to_string(),
            details: None,
        }
    }
}

impl From<CacheError> for HandlerErr {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::NotAList(ref field) => HandlerErr {
                code: "bad_params",
                message: e.to_string(),
                details: Some(json!({ "listField": field })),
            },
            CacheError::ItemNotFound(ref id) => {
                HandlerErr::not_found(e.to_string(), json!({ "id": id }))
            }
        }
    }
}
