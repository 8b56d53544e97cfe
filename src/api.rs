//! HTTP client for the InsightClass backend. Every authenticated call goes
//! through the same discipline: obtain a token valid beyond the skew
//! window, dispatch, and on a 401 refresh once and replay once. A second
//! 401 ends the session.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{classify_failure, ApiError};
use crate::model::{
    Classroom, ClassroomAssignments, ClassroomId, ClassroomPayload, Feedback, FeedbackCreate,
    FeedbackId, FeedbackMine, FeedbackSummary, KeywordId, MetricsOverview, Role, School, SchoolId,
    SchoolPayload, Subject, SubjectId, SubjectPayload, TriggerKeyword, User, UserCreate, UserId,
    UserUpdate,
};
use crate::session::{SessionManager, Token, TokenRefresher};

/// Default safety margin subtracted from token expiry to refresh
/// proactively instead of racing the deadline.
pub const DEFAULT_SKEW_SECONDS: i64 = 30;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionManager>,
    skew: Duration,
}

impl ApiClient {
    /// `base_url` points at the API root, e.g. `https://host/api/v1`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: Arc::new(SessionManager::new()),
            skew: Duration::seconds(DEFAULT_SKEW_SECONDS),
        }
    }

    pub fn with_skew(mut self, skew: Duration) -> Self {
        self.skew = skew;
        self
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // --- auth -------------------------------------------------------------

    /// Exchange credentials for a token, install it, and return the
    /// authenticated profile.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport)?;
        let token: TokenResponse = expect_json(response).await?;
        self.session.install(Token::from_jwt(token.access_token)).await;
        self.current_user().await
    }

    pub async fn logout(&self) {
        self.session.clear().await;
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.get_authed("/auth/me", &[]).await
    }

    // --- directory reads --------------------------------------------------

    pub async fn list_schools(&self) -> Result<Vec<School>, ApiError> {
        self.get_authed("/admin/schools", &[]).await
    }

    pub async fn list_subjects(&self, school: Option<SchoolId>) -> Result<Vec<Subject>, ApiError> {
        self.get_authed("/admin/subjects", &school_query(school)).await
    }

    pub async fn list_classrooms(
        &self,
        school: Option<SchoolId>,
    ) -> Result<Vec<Classroom>, ApiError> {
        self.get_authed("/admin/classrooms", &school_query(school)).await
    }

    pub async fn list_users(
        &self,
        role: Option<Role>,
        school: Option<SchoolId>,
    ) -> Result<Vec<User>, ApiError> {
        let mut query = school_query(school);
        if let Some(role) = role {
            query.push(("role", role.wire_name().to_string()));
        }
        self.get_authed("/admin/users", &query).await
    }

    // --- directory writes -------------------------------------------------

    pub async fn create_school(&self, payload: &SchoolPayload) -> Result<School, ApiError> {
        self.post_authed("/admin/schools", payload).await
    }

    pub async fn update_school(
        &self,
        id: SchoolId,
        payload: &SchoolPayload,
    ) -> Result<School, ApiError> {
        self.put_authed(&format!("/admin/schools/{id}"), payload).await
    }

    pub async fn delete_school(&self, id: SchoolId) -> Result<(), ApiError> {
        self.delete_authed(&format!("/admin/schools/{id}")).await
    }

    pub async fn create_subject(&self, payload: &SubjectPayload) -> Result<Subject, ApiError> {
        self.post_authed("/admin/subjects", payload).await
    }

    pub async fn update_subject(
        &self,
        id: SubjectId,
        payload: &SubjectPayload,
    ) -> Result<Subject, ApiError> {
        self.put_authed(&format!("/admin/subjects/{id}"), payload).await
    }

    pub async fn delete_subject(&self, id: SubjectId) -> Result<(), ApiError> {
        self.delete_authed(&format!("/admin/subjects/{id}")).await
    }

    pub async fn create_classroom(
        &self,
        payload: &ClassroomPayload,
    ) -> Result<Classroom, ApiError> {
        self.post_authed("/admin/classrooms", payload).await
    }

    pub async fn update_classroom(
        &self,
        id: ClassroomId,
        payload: &ClassroomPayload,
    ) -> Result<Classroom, ApiError> {
        self.put_authed(&format!("/admin/classrooms/{id}"), payload).await
    }

    pub async fn delete_classroom(&self, id: ClassroomId) -> Result<(), ApiError> {
        self.delete_authed(&format!("/admin/classrooms/{id}")).await
    }

    pub async fn create_user(&self, payload: &UserCreate) -> Result<User, ApiError> {
        self.post_authed("/admin/users", payload).await
    }

    pub async fn update_user(&self, id: &UserId, payload: &UserUpdate) -> Result<User, ApiError> {
        self.put_authed(&format!("/admin/users/{id}"), payload).await
    }

    pub async fn delete_user(&self, id: &UserId) -> Result<(), ApiError> {
        self.delete_authed(&format!("/admin/users/{id}")).await
    }

    // --- assignments ------------------------------------------------------

    pub async fn get_assignments(
        &self,
        classroom: ClassroomId,
    ) -> Result<ClassroomAssignments, ApiError> {
        self.get_authed(&format!("/admin/assignments/{classroom}"), &[]).await
    }

    pub async fn put_assignments(
        &self,
        payload: &ClassroomAssignments,
    ) -> Result<ClassroomAssignments, ApiError> {
        self.put_authed(&format!("/admin/assignments/{}", payload.classroom_id), payload)
            .await
    }

    // --- trigger keywords -------------------------------------------------

    pub async fn list_trigger_keywords(
        &self,
        school: Option<SchoolId>,
    ) -> Result<Vec<TriggerKeyword>, ApiError> {
        self.get_authed("/admin/trigger_keywords", &school_query(school)).await
    }

    pub async fn create_trigger_keyword(
        &self,
        keyword: &str,
        school: Option<SchoolId>,
    ) -> Result<TriggerKeyword, ApiError> {
        self.post_authed(
            "/admin/trigger_keywords",
            &json!({ "keyword": keyword, "school_id": school }),
        )
        .await
    }

    pub async fn delete_trigger_keyword(&self, id: KeywordId) -> Result<(), ApiError> {
        self.delete_authed(&format!("/admin/trigger_keywords/{id}")).await
    }

    // --- metrics ----------------------------------------------------------

    pub async fn metrics_overview(&self) -> Result<MetricsOverview, ApiError> {
        self.get_authed("/admin/metrics/overview", &[]).await
    }

    // --- feedback ---------------------------------------------------------

    pub async fn create_feedback(&self, payload: &FeedbackCreate) -> Result<Feedback, ApiError> {
        self.post_authed("/feedback", payload).await
    }

    pub async fn list_my_feedbacks(&self) -> Result<FeedbackMine, ApiError> {
        self.get_authed("/feedback/mine", &[]).await
    }

    pub async fn list_all_feedbacks(
        &self,
        school: Option<SchoolId>,
    ) -> Result<Vec<Feedback>, ApiError> {
        self.get_authed("/feedback/admin/all", &school_query(school)).await
    }

    pub async fn list_trigger_alerts(
        &self,
        include_resolved: bool,
    ) -> Result<Vec<Feedback>, ApiError> {
        self.get_authed(
            "/feedback/triggers",
            &[("include_resolved", include_resolved.to_string())],
        )
        .await
    }

    pub async fn report_feedback(
        &self,
        id: FeedbackId,
        reason: &str,
    ) -> Result<Feedback, ApiError> {
        self.post_authed(&format!("/feedback/{id}/report"), &json!({ "reason": reason }))
            .await
    }

    pub async fn resolve_alert(
        &self,
        id: FeedbackId,
        note: Option<&str>,
    ) -> Result<Feedback, ApiError> {
        self.post_authed(
            &format!("/feedback/triggers/{id}/resolve"),
            &json!({ "note": note }),
        )
        .await
    }

    pub async fn delete_feedback(&self, id: FeedbackId) -> Result<(), ApiError> {
        self.delete_authed(&format!("/feedback/admin/{id}")).await
    }

    pub async fn personal_summary(&self) -> Result<FeedbackSummary, ApiError> {
        self.get_authed("/feedback/summary/me", &[]).await
    }

    pub async fn admin_summary(
        &self,
        school: Option<SchoolId>,
    ) -> Result<FeedbackSummary, ApiError> {
        self.get_authed("/feedback/summary/admin", &school_query(school)).await
    }

    // --- plumbing ---------------------------------------------------------

    async fn get_authed<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self
            .send_authed(path, |http, token| {
                http.get(&url).query(query).bearer_auth(token)
            })
            .await?;
        expect_json(response).await
    }

    async fn post_authed<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self
            .send_authed(path, |http, token| {
                http.post(&url).bearer_auth(token).json(body)
            })
            .await?;
        expect_json(response).await
    }

    async fn put_authed<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self
            .send_authed(path, |http, token| {
                http.put(&url).bearer_auth(token).json(body)
            })
            .await?;
        expect_json(response).await
    }

    async fn delete_authed(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        let response = self
            .send_authed(path, |http, token| http.delete(&url).bearer_auth(token))
            .await?;
        expect_empty(response).await
    }

    /// Dispatch with a valid token; on 401 refresh once and rebuild the
    /// request for a single replay. The builder closure is re-invoked so no
    /// consumed body is ever reused.
    async fn send_authed<F>(&self, op: &str, make: F) -> Result<Response, ApiError>
    where
        F: Fn(&reqwest::Client, &str) -> RequestBuilder,
    {
        let token = self.session.ensure_valid(self, self.skew).await?;
        debug!(op, "dispatching authenticated request");
        let response = make(&self.http, &token.raw).send().await.map_err(transport)?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!(op, "unauthorized response, refreshing and replaying once");
        let fresh = self.session.force_refresh(self).await?;
        let replay = make(&self.http, &fresh.raw).send().await.map_err(transport)?;
        if replay.status() == StatusCode::UNAUTHORIZED {
            self.session.clear().await;
            return Err(ApiError::SessionExpired);
        }
        Ok(replay)
    }
}

#[async_trait]
impl TokenRefresher for ApiClient {
    async fn refresh(&self, current: &Token) -> Result<Token, ApiError> {
        let response = self
            .http
            .post(self.url("/auth/refresh"))
            .bearer_auth(&current.raw)
            .send()
            .await
            .map_err(transport)?;
        let token: TokenResponse = expect_json(response).await?;
        Ok(Token::from_jwt(token.access_token))
    }
}

fn school_query(school: Option<SchoolId>) -> Vec<(&'static str, String)> {
    match school {
        Some(id) => vec![("school_id", id.to_string())],
        None => Vec::new(),
    }
}

fn transport(err: reqwest::Error) -> ApiError {
    ApiError::Transport(err.to_string())
}

async fn expect_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(transport);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status.as_u16(), &body))
}

async fn expect_empty(response: Response) -> Result<(), ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status.as_u16(), &body))
}
