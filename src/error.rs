use serde_json::Value;
use thiserror::Error;

/// Failure classes for remote operations. Validation never lands here: the
/// validator returns `FieldError` lists and blocks the call client-side.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// No usable token, or the retried call came back 401 again. The caller
    /// must treat the session as ended and force re-authentication.
    #[error("Sessão expirada. Faça login novamente.")]
    SessionExpired,

    /// Authorized but disallowed. Server detail shown verbatim, no retry.
    #[error("{0}")]
    Forbidden(String),

    /// 409: the remote store refused because dependents exist.
    #[error("{0}")]
    Conflict(String),

    /// Any other non-2xx with whatever detail the body carried.
    #[error("Falha na operação ({status}): {message}")]
    Remote { status: u16, message: String },

    /// Network-level failure before a status code existed.
    #[error("Falha de comunicação com o servidor: {0}")]
    Transport(String),
}

impl ApiError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }
}

const CONFLICT_FALLBACK: &str =
    "Não é possível remover: existem registros dependentes vinculados a este item.";

/// Map a non-2xx response to its error class. The 401 case is only terminal
/// after the client has already spent its single refresh-and-replay.
pub fn classify_failure(status: u16, body: &str) -> ApiError {
    let detail = extract_detail(body);
    match status {
        401 => ApiError::SessionExpired,
        403 => ApiError::Forbidden(
            detail.unwrap_or_else(|| "Permissão negada para esta operação.".to_string()),
        ),
        409 => ApiError::Conflict(detail.unwrap_or_else(|| CONFLICT_FALLBACK.to_string())),
        _ => ApiError::Remote {
            status,
            message: detail.unwrap_or_else(|| {
                if body.trim().is_empty() {
                    "sem detalhes".to_string()
                } else {
                    body.trim().to_string()
                }
            }),
        },
    }
}

/// Best-effort extraction from the `{"detail": ...}` error contract. The
/// detail may be a plain string or a list of validation entries with `msg`.
fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => items
            .iter()
            .find_map(|item| item.get("msg").and_then(Value::as_str))
            .map(|s| s.to_string()),
        _ => None,
    }
}

/// One field-scoped validation problem. A non-empty list blocks submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_carries_server_detail_verbatim() {
        let err = classify_failure(403, r#"{"detail": "Gestores só podem operar na própria unidade"}"#);
        match err {
            ApiError::Forbidden(msg) => {
                assert_eq!(msg, "Gestores só podem operar na própria unidade")
            }
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }

    #[test]
    fn conflict_without_detail_uses_dependency_hint() {
        let err = classify_failure(409, "");
        match err {
            ApiError::Conflict(msg) => assert!(msg.contains("registros dependentes")),
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn conflict_is_distinct_from_generic_failure() {
        let conflict = classify_failure(409, r#"{"detail": "Matéria vinculada a turmas"}"#);
        let generic = classify_failure(500, r#"{"detail": "Erro interno"}"#);
        assert!(matches!(conflict, ApiError::Conflict(_)));
        assert!(matches!(generic, ApiError::Remote { status: 500, .. }));
    }

    #[test]
    fn validation_list_detail_extracts_first_msg() {
        let body = r#"{"detail": [{"loc": ["body", "name"], "msg": "campo obrigatório", "type": "missing"}]}"#;
        match classify_failure(422, body) {
            ApiError::Remote { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "campo obrigatório");
            }
            other => panic!("expected Remote, got {other:?}"),
        }
    }

    #[test]
    fn unauthorized_maps_to_session_expired() {
        assert!(classify_failure(401, "{}").is_session_expired());
    }
}
