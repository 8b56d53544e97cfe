//! Trigger alert workflow: Active → Resolved, plus manual reporting and
//! monitored-keyword management. Alerts originate either from automatic
//! keyword matching or from a manual report; the origin metadata is
//! recorded at creation and never changed here.

use thiserror::Error;
use tracing::debug;

use crate::api::ApiClient;
use crate::directory::Directory;
use crate::error::{ApiError, FieldError};
use crate::forms::normalize_keyword;
use crate::model::{
    Feedback, FeedbackId, KeywordId, Role, SchoolId, TargetKind, TriggerKeyword, User,
};

pub const MIN_REPORT_REASON_LEN: usize = 5;
pub const MAX_REPORT_REASON_LEN: usize = 280;

/// Outcome of a workflow action. Local guard rejections never reach the
/// network and stay field-scoped; everything else is a remote failure.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{}", .0.message)]
    Rejected(FieldError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// The two projections of the alert queue. Each is loaded by its own remote
/// call; neither is derived by splitting a shared cached list.
#[derive(Debug, Default)]
pub struct AlertBoard {
    pub active: Vec<Feedback>,
    pub resolved: Vec<Feedback>,
}

impl AlertBoard {
    pub fn is_active(&self, id: FeedbackId) -> bool {
        self.active.iter().any(|f| f.id == id)
    }

    /// Redundant client-side scope filter for manager views: keep only
    /// events whose sender or target belongs to the given school. The query
    /// scope on the server remains the primary guard.
    pub fn scoped_to(self, school: SchoolId, directory: &Directory) -> AlertBoard {
        let keep = |f: &Feedback| {
            let sender_school = f
                .sender_school_id
                .or_else(|| directory.person(&f.sender_id).and_then(|u| u.school_id));
            let target_school = f.target_school_id.or_else(|| match f.target_type {
                TargetKind::User => directory.person(&f.target_id).and_then(|u| u.school_id),
                TargetKind::Class => f
                    .target_id
                    .parse()
                    .ok()
                    .and_then(|id| directory.classroom(id))
                    .map(|c| c.school_id),
                TargetKind::Subject => f
                    .target_id
                    .parse()
                    .ok()
                    .and_then(|id| directory.subject(id))
                    .map(|s| s.school_id),
            });
            sender_school == Some(school) || target_school == Some(school)
        };
        AlertBoard {
            active: self.active.into_iter().filter(|f| keep(f)).collect(),
            resolved: self.resolved.into_iter().filter(|f| keep(f)).collect(),
        }
    }
}

pub struct AlertWorkflow<'a> {
    api: &'a ApiClient,
}

impl<'a> AlertWorkflow<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Load both projections. The active list is the unresolved query; the
    /// resolved list comes from a second call with resolved events included,
    /// narrowed to those carrying a resolution timestamp.
    pub async fn load_board(&self) -> Result<AlertBoard, ApiError> {
        let active = self.api.list_trigger_alerts(false).await?;
        let all = self.api.list_trigger_alerts(true).await?;
        let resolved = all.into_iter().filter(|f| f.is_resolved_alert()).collect();
        Ok(AlertBoard { active, resolved })
    }

    /// Active → Resolved. Only events currently in the active projection
    /// are eligible; a resolved event never comes back through here. On
    /// success both projections are reloaded.
    pub async fn resolve(
        &self,
        board: &AlertBoard,
        id: FeedbackId,
        note: Option<&str>,
    ) -> Result<AlertBoard, WorkflowError> {
        if !board.is_active(id) {
            // Already resolved (or never an alert): nothing to act upon.
            return Err(WorkflowError::Rejected(FieldError::new(
                "feedback_id",
                "Este alerta já foi marcado como resolvido.",
            )));
        }
        let note = note.map(str::trim).filter(|n| !n.is_empty());
        debug!(feedback_id = id, "resolving trigger alert");
        self.api.resolve_alert(id, note).await?;
        Ok(self.load_board().await?)
    }

    /// Manual report. Guards run before any network traffic: an event that
    /// already carries the trigger flag is not reported twice, and the
    /// reason must be substantive.
    pub async fn report(&self, event: &Feedback, reason: &str) -> Result<Feedback, WorkflowError> {
        let reason = validate_report_reason(event, reason).map_err(WorkflowError::Rejected)?;
        debug!(feedback_id = event.id, "reporting manual alert");
        Ok(self.api.report_feedback(event.id, &reason).await?)
    }

    // --- monitored keywords ----------------------------------------------

    pub async fn list_keywords(
        &self,
        viewer: &User,
        requested: Option<SchoolId>,
    ) -> Result<Vec<TriggerKeyword>, ApiError> {
        let scope = resolve_keyword_scope(viewer, requested)?;
        self.api.list_trigger_keywords(scope).await
    }

    /// Create a monitored term. The institution scope is resolved here and
    /// never taken from the caller as-is: admins choose (None = network
    /// wide), managers are pinned to their own institution.
    pub async fn add_keyword(
        &self,
        viewer: &User,
        raw_keyword: &str,
        requested: Option<SchoolId>,
    ) -> Result<TriggerKeyword, WorkflowError> {
        let keyword = normalize_keyword(raw_keyword).map_err(WorkflowError::Rejected)?;
        let scope = resolve_keyword_scope(viewer, requested)?;
        Ok(self.api.create_trigger_keyword(&keyword, scope).await?)
    }

    pub async fn remove_keyword(
        &self,
        viewer: &User,
        keyword: &TriggerKeyword,
    ) -> Result<(), ApiError> {
        if viewer.role == Role::Manager && keyword.school_id != viewer.school_id {
            return Err(ApiError::Forbidden(
                "Gestores só podem remover palavras da própria unidade".to_string(),
            ));
        }
        self.remove_keyword_by_id(keyword.id).await
    }

    pub async fn remove_keyword_by_id(&self, id: KeywordId) -> Result<(), ApiError> {
        self.api.delete_trigger_keyword(id).await
    }
}

/// Pure guard for the manual-report action. Returns the trimmed, truncated
/// reason the remote call should carry.
pub fn validate_report_reason(event: &Feedback, reason: &str) -> Result<String, FieldError> {
    if event.has_trigger {
        return Err(FieldError::new(
            "reason",
            "Este feedback já está marcado como alerta.",
        ));
    }
    let trimmed = reason.trim();
    if trimmed.chars().count() < MIN_REPORT_REASON_LEN {
        return Err(FieldError::new(
            "reason",
            "Informe um motivo válido para o alerta.",
        ));
    }
    Ok(trimmed.chars().take(MAX_REPORT_REASON_LEN).collect())
}

/// Keyword scope rule, shared with person creation: admins pass scope
/// through, managers are forced onto their own institution and any
/// conflicting request is refused rather than corrected.
pub fn resolve_keyword_scope(
    viewer: &User,
    requested: Option<SchoolId>,
) -> Result<Option<SchoolId>, ApiError> {
    match viewer.role {
        Role::Admin => Ok(requested),
        Role::Manager => {
            let own = viewer.school_id.ok_or_else(|| {
                ApiError::Forbidden(
                    "Seu perfil de gestor não está vinculado a uma unidade escolar".to_string(),
                )
            })?;
            match requested {
                Some(school) if school != own => Err(ApiError::Forbidden(
                    "Gestores só podem operar na própria unidade".to_string(),
                )),
                _ => Ok(Some(own)),
            }
        }
        _ => Err(ApiError::Forbidden(
            "Apenas administradores e gestores gerenciam palavras-chave".to_string(),
        )),
    }
}
