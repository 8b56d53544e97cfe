//! Client-side core of the InsightClass management console.
//!
//! The crate owns the four hard pieces the console screens share: the
//! session-token lifecycle, the referential directory of schools, subjects,
//! classrooms and people, the cascading form validation over that
//! hierarchy, and the feedback analytics plus trigger-alert workflow. The
//! remote backend is the authority for persistence and final validation;
//! this crate consumes its request/response contracts and keeps the local
//! state disciplined.

pub mod alerts;
pub mod analytics;
pub mod api;
pub mod directory;
pub mod error;
pub mod forms;
pub mod model;
pub mod session;

pub use alerts::{AlertBoard, AlertWorkflow, WorkflowError};
pub use analytics::{aggregate, totals, Aggregation, FeedbackTotals, RankingSet};
pub use api::ApiClient;
pub use directory::{load_directory, Directory, LoadStamp};
pub use error::{ApiError, FieldError};
pub use forms::{eligible_teachers, required_fields, validate_assignments, PersonForm};
pub use model::{
    Classroom, Feedback, Role, School, Sentiment, Subject, TargetKind, TriggerKeyword, User,
};
pub use session::{SessionManager, Token, TokenRefresher};
