//! Cascading constraint validation for the person, structure and keyword
//! editors. Everything here is pure: the validator reads the directory and
//! the form, and returns field-scoped errors. A non-empty error list blocks
//! submission; nothing reaches the network.

use crate::directory::Directory;
use crate::error::FieldError;
use crate::model::{
    ClassroomAssignments, ClassroomId, Role, SchoolId, SubjectId, User, UserCreate, UserId,
    UserUpdate,
};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_KEYWORD_LEN: usize = 2;
pub const MAX_KEYWORD_LEN: usize = 128;

/// Fields shared by every role variant.
#[derive(Debug, Clone, Default)]
pub struct PersonBase {
    pub full_name: String,
    pub email: String,
    /// Empty on edit means "leave the credential unchanged".
    pub password: String,
    /// Set when editing an existing person.
    pub editing: Option<UserId>,
}

/// Role-shaped person form. Each variant carries only the references that
/// exist for that role, so stale state cannot hide in unused fields.
#[derive(Debug, Clone)]
pub enum PersonForm {
    Admin {
        base: PersonBase,
    },
    Manager {
        base: PersonBase,
        school: Option<SchoolId>,
    },
    Teacher {
        base: PersonBase,
        school: Option<SchoolId>,
        teachable: Vec<SubjectId>,
    },
    Student {
        base: PersonBase,
        school: Option<SchoolId>,
        classroom: Option<ClassroomId>,
    },
}

/// Field names the UI must require for a role, before any value-level
/// validation happens.
pub fn required_fields(role: Role) -> &'static [&'static str] {
    match role {
        Role::Admin => &["full_name", "email", "password"],
        Role::Manager => &["full_name", "email", "password", "school_id"],
        Role::Teacher => &[
            "full_name",
            "email",
            "password",
            "school_id",
            "teachable_subject_ids",
        ],
        Role::Student => &["full_name", "email", "password", "school_id", "classroom_id"],
    }
}

impl PersonForm {
    pub fn empty(role: Role) -> PersonForm {
        let base = PersonBase::default();
        match role {
            Role::Admin => PersonForm::Admin { base },
            Role::Manager => PersonForm::Manager { base, school: None },
            Role::Teacher => PersonForm::Teacher {
                base,
                school: None,
                teachable: Vec::new(),
            },
            Role::Student => PersonForm::Student {
                base,
                school: None,
                classroom: None,
            },
        }
    }

    /// Prefill from an existing directory entry for editing.
    pub fn from_user(user: &User) -> PersonForm {
        let base = PersonBase {
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            password: String::new(),
            editing: Some(user.id.clone()),
        };
        match user.role {
            Role::Admin => PersonForm::Admin { base },
            Role::Manager => PersonForm::Manager {
                base,
                school: user.school_id,
            },
            Role::Teacher => PersonForm::Teacher {
                base,
                school: user.school_id,
                teachable: user.teachable_subject_ids.clone(),
            },
            Role::Student => PersonForm::Student {
                base,
                school: user.school_id,
                classroom: user.classroom_id,
            },
        }
    }

    pub fn role(&self) -> Role {
        match self {
            PersonForm::Admin { .. } => Role::Admin,
            PersonForm::Manager { .. } => Role::Manager,
            PersonForm::Teacher { .. } => Role::Teacher,
            PersonForm::Student { .. } => Role::Student,
        }
    }

    pub fn base(&self) -> &PersonBase {
        match self {
            PersonForm::Admin { base }
            | PersonForm::Manager { base, .. }
            | PersonForm::Teacher { base, .. }
            | PersonForm::Student { base, .. } => base,
        }
    }

    pub fn base_mut(&mut self) -> &mut PersonBase {
        match self {
            PersonForm::Admin { base }
            | PersonForm::Manager { base, .. }
            | PersonForm::Teacher { base, .. }
            | PersonForm::Student { base, .. } => base,
        }
    }

    pub fn school(&self) -> Option<SchoolId> {
        match self {
            PersonForm::Admin { .. } => None,
            PersonForm::Manager { school, .. }
            | PersonForm::Teacher { school, .. }
            | PersonForm::Student { school, .. } => *school,
        }
    }

    /// The cascade: moving the form to another institution drops every
    /// dependent selection that no longer belongs to it. A stale reference
    /// is never silently kept.
    pub fn set_school(&mut self, new_school: Option<SchoolId>, directory: &Directory) {
        match self {
            PersonForm::Admin { .. } => {}
            PersonForm::Manager { school, .. } => *school = new_school,
            PersonForm::Teacher {
                school, teachable, ..
            } => {
                *school = new_school;
                match new_school {
                    Some(s) => teachable.retain(|id| directory.subject_in_school(*id, s)),
                    None => teachable.clear(),
                }
            }
            PersonForm::Student {
                school, classroom, ..
            } => {
                *school = new_school;
                let keep = match (new_school, *classroom) {
                    (Some(s), Some(c)) => directory.classroom_in_school(c, s),
                    _ => false,
                };
                if !keep {
                    *classroom = None;
                }
            }
        }
    }

    /// Full consistency check. Order of errors follows the form layout so
    /// the UI can focus the first offending field.
    pub fn validate(&self, directory: &Directory, viewer: &User) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let base = self.base();

        if base.full_name.trim().is_empty() {
            errors.push(FieldError::new("full_name", "Informe o nome completo"));
        }
        if !looks_like_email(&base.email) {
            errors.push(FieldError::new("email", "Informe um e-mail válido"));
        }
        let password = base.password.trim();
        if base.editing.is_none() {
            if password.len() < MIN_PASSWORD_LEN {
                errors.push(FieldError::new(
                    "password",
                    format!("A senha precisa de ao menos {MIN_PASSWORD_LEN} caracteres"),
                ));
            }
        } else if !password.is_empty() && password.len() < MIN_PASSWORD_LEN {
            errors.push(FieldError::new(
                "password",
                format!("A nova senha precisa de ao menos {MIN_PASSWORD_LEN} caracteres"),
            ));
        }

        if self.role().needs_school() {
            match self.school() {
                None => errors.push(FieldError::new(
                    "school_id",
                    "É necessário informar a unidade escolar para este perfil",
                )),
                Some(school) => {
                    if directory.school(school).is_none() {
                        errors.push(FieldError::new("school_id", "Unidade escolar não encontrada"));
                    }
                    // Managers may only target their own institution; the
                    // mismatch is rejected, never silently corrected.
                    if viewer.role == Role::Manager && viewer.school_id != Some(school) {
                        errors.push(FieldError::new(
                            "school_id",
                            "Gestores só podem operar na própria unidade",
                        ));
                    }
                }
            }
        }

        match self {
            PersonForm::Admin { .. } | PersonForm::Manager { .. } => {}
            PersonForm::Teacher {
                school, teachable, ..
            } => {
                if teachable.is_empty() {
                    errors.push(FieldError::new(
                        "teachable_subject_ids",
                        "Professores precisam ter ao menos uma matéria habilitada",
                    ));
                } else if let Some(s) = school {
                    for subject in teachable {
                        if !directory.subject_in_school(*subject, *s) {
                            errors.push(FieldError::new(
                                "teachable_subject_ids",
                                "Matéria inválida para a unidade informada",
                            ));
                            break;
                        }
                    }
                }
            }
            PersonForm::Student {
                school, classroom, ..
            } => match (school, classroom) {
                (_, None) => errors.push(FieldError::new(
                    "classroom_id",
                    "Alunos precisam estar vinculados a uma turma",
                )),
                (Some(s), Some(c)) => {
                    if !directory.classroom_in_school(*c, *s) {
                        errors.push(FieldError::new(
                            "classroom_id",
                            "Turma inválida para a unidade informada",
                        ));
                    }
                }
                (None, Some(_)) => {}
            },
        }

        errors
    }

    /// Build the create payload. Call only after `validate` came back empty.
    pub fn create_payload(&self) -> UserCreate {
        let base = self.base();
        let (classroom, teachable) = match self {
            PersonForm::Student { classroom, .. } => (*classroom, Vec::new()),
            PersonForm::Teacher { teachable, .. } => (None, teachable.clone()),
            _ => (None, Vec::new()),
        };
        UserCreate {
            email: base.email.trim().to_lowercase(),
            full_name: base.full_name.trim().to_string(),
            role: self.role(),
            password: base.password.trim().to_string(),
            school_id: self.school(),
            classroom_id: classroom,
            teachable_subject_ids: teachable,
        }
    }

    /// Build the update payload. An empty password field is omitted, which
    /// the server reads as "leave unchanged".
    pub fn update_payload(&self) -> UserUpdate {
        let base = self.base();
        let password = base.password.trim();
        let (classroom, teachable) = match self {
            PersonForm::Student { classroom, .. } => (*classroom, None),
            PersonForm::Teacher { teachable, .. } => (None, Some(teachable.clone())),
            _ => (None, None),
        };
        UserUpdate {
            email: Some(base.email.trim().to_lowercase()),
            full_name: Some(base.full_name.trim().to_string()),
            role: Some(self.role()),
            password: (!password.is_empty()).then(|| password.to_string()),
            school_id: self.school(),
            classroom_id: classroom,
            teachable_subject_ids: teachable,
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    let trimmed = value.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    }
}

// --- assignment editor ----------------------------------------------------

/// Selectable teachers for one subject of a classroom: teachers of the
/// classroom's institution who are eligible for that subject. An empty
/// result tells the UI to disable the selection instead of allowing an
/// invalid save.
pub fn eligible_teachers<'a>(
    directory: &'a Directory,
    classroom: ClassroomId,
    subject: SubjectId,
) -> Vec<&'a User> {
    let Some(room) = directory.classroom(classroom) else {
        return Vec::new();
    };
    directory
        .teachers_of(room.school_id)
        .into_iter()
        .filter(|t| t.teachable_subject_ids.contains(&subject))
        .collect()
}

/// Consistency check for the per-classroom teacher map before it is saved.
pub fn validate_assignments(
    payload: &ClassroomAssignments,
    directory: &Directory,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let Some(room) = directory.classroom(payload.classroom_id) else {
        errors.push(FieldError::new("classroom_id", "Turma não encontrada"));
        return errors;
    };

    for entry in &payload.assignments {
        if !room.subject_ids.contains(&entry.subject_id) {
            errors.push(FieldError::new(
                "assignments",
                format!(
                    "A matéria {} não pertence à turma {}",
                    directory
                        .subject_name(entry.subject_id)
                        .unwrap_or("desconhecida"),
                    room.name
                ),
            ));
            continue;
        }
        if let Some(teacher_id) = &entry.teacher_id {
            if !directory.teacher_eligible(teacher_id, entry.subject_id, payload.classroom_id) {
                let teacher_name = directory
                    .person(teacher_id)
                    .map(|t| t.full_name.as_str())
                    .unwrap_or("desconhecido");
                errors.push(FieldError::new(
                    "assignments",
                    format!(
                        "Professor {} não está habilitado para {} nesta unidade",
                        teacher_name,
                        directory
                            .subject_name(entry.subject_id)
                            .unwrap_or("a matéria"),
                    ),
                ));
            }
        }
    }
    errors
}

// --- structural forms -----------------------------------------------------

pub fn school_form_errors(name: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if name.trim().len() < 2 {
        errors.push(FieldError::new("name", "Informe o nome da unidade escolar"));
    }
    errors
}

pub fn subject_form_errors(
    name: &str,
    school: Option<SchoolId>,
    viewer: &User,
    directory: &Directory,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if name.trim().len() < 2 {
        errors.push(FieldError::new("name", "Informe o nome da matéria"));
    }
    push_school_scope_errors(&mut errors, school, viewer, directory);
    errors
}

pub fn classroom_form_errors(
    name: &str,
    school: Option<SchoolId>,
    subject_ids: &[SubjectId],
    viewer: &User,
    directory: &Directory,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "Informe o nome da turma"));
    }
    push_school_scope_errors(&mut errors, school, viewer, directory);
    if subject_ids.is_empty() {
        errors.push(FieldError::new(
            "subject_ids",
            "A turma precisa de ao menos uma matéria vinculada",
        ));
    } else if let Some(s) = school {
        if subject_ids.iter().any(|id| !directory.subject_in_school(*id, s)) {
            errors.push(FieldError::new(
                "subject_ids",
                "Matéria inválida para a unidade informada",
            ));
        }
    }
    errors
}

fn push_school_scope_errors(
    errors: &mut Vec<FieldError>,
    school: Option<SchoolId>,
    viewer: &User,
    directory: &Directory,
) {
    match school {
        None => errors.push(FieldError::new("school_id", "school_id é obrigatório")),
        Some(s) => {
            if directory.school(s).is_none() {
                errors.push(FieldError::new("school_id", "Unidade escolar não encontrada"));
            }
            if viewer.role == Role::Manager && viewer.school_id != Some(s) {
                errors.push(FieldError::new(
                    "school_id",
                    "Gestores só podem operar na própria unidade",
                ));
            }
        }
    }
}

// --- keyword form ---------------------------------------------------------

/// Normalize and validate a monitored term. Returns the lowercased keyword
/// the create call should carry.
pub fn normalize_keyword(raw: &str) -> Result<String, FieldError> {
    let keyword = raw.trim().to_lowercase();
    if keyword.len() < MIN_KEYWORD_LEN {
        return Err(FieldError::new("keyword", "Informe uma palavra válida"));
    }
    if keyword.len() > MAX_KEYWORD_LEN {
        return Err(FieldError::new(
            "keyword",
            format!("A palavra não pode exceder {MAX_KEYWORD_LEN} caracteres"),
        ));
    }
    Ok(keyword)
}
