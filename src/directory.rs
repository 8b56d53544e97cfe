use std::collections::HashMap;

use tracing::warn;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::model::{
    Classroom, ClassroomId, Role, School, SchoolId, Subject, SubjectId, User, UserId,
};

/// Snapshot used to discard late-arriving loads. Taken before an async
/// fetch starts; installation is refused when the collection was replaced
/// in the meantime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStamp(u64);

/// In-memory view of the entity collections, loaded in bulk from the remote
/// service and replaced wholesale after any mutation. Lookup maps are
/// rebuilt on every replace so name/attribute resolution stays O(1) for the
/// analytics and validation layers.
#[derive(Debug, Default)]
pub struct Directory {
    schools: Vec<School>,
    subjects: Vec<Subject>,
    classrooms: Vec<Classroom>,
    people: Vec<User>,

    school_index: HashMap<SchoolId, usize>,
    subject_index: HashMap<SubjectId, usize>,
    classroom_index: HashMap<ClassroomId, usize>,
    person_index: HashMap<UserId, usize>,

    schools_stamp: u64,
    subjects_stamp: u64,
    classrooms_stamp: u64,
    people_stamp: u64,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    // --- wholesale replacement ------------------------------------------

    pub fn replace_schools(&mut self, data: Vec<School>) {
        self.schools = data;
        self.school_index = self.schools.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
        self.schools_stamp += 1;
    }

    pub fn replace_subjects(&mut self, data: Vec<Subject>) {
        self.subjects = data;
        self.subject_index = self.subjects.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
        self.subjects_stamp += 1;
    }

    pub fn replace_classrooms(&mut self, data: Vec<Classroom>) {
        self.classrooms = data;
        self.classroom_index = self
            .classrooms
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i))
            .collect();
        self.classrooms_stamp += 1;
    }

    pub fn replace_people(&mut self, data: Vec<User>) {
        self.people = data;
        self.person_index = self
            .people
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        self.people_stamp += 1;
    }

    // --- stale-load guards ----------------------------------------------

    pub fn schools_stamp(&self) -> LoadStamp {
        LoadStamp(self.schools_stamp)
    }

    pub fn subjects_stamp(&self) -> LoadStamp {
        LoadStamp(self.subjects_stamp)
    }

    pub fn classrooms_stamp(&self) -> LoadStamp {
        LoadStamp(self.classrooms_stamp)
    }

    pub fn people_stamp(&self) -> LoadStamp {
        LoadStamp(self.people_stamp)
    }

    /// Install a completed load unless the collection moved on while the
    /// request was in flight. Returns whether the data was taken.
    pub fn install_schools(&mut self, stamp: LoadStamp, data: Vec<School>) -> bool {
        if stamp != self.schools_stamp() {
            warn!("discarding stale schools load");
            return false;
        }
        self.replace_schools(data);
        true
    }

    pub fn install_subjects(&mut self, stamp: LoadStamp, data: Vec<Subject>) -> bool {
        if stamp != self.subjects_stamp() {
            warn!("discarding stale subjects load");
            return false;
        }
        self.replace_subjects(data);
        true
    }

    pub fn install_classrooms(&mut self, stamp: LoadStamp, data: Vec<Classroom>) -> bool {
        if stamp != self.classrooms_stamp() {
            warn!("discarding stale classrooms load");
            return false;
        }
        self.replace_classrooms(data);
        true
    }

    pub fn install_people(&mut self, stamp: LoadStamp, data: Vec<User>) -> bool {
        if stamp != self.people_stamp() {
            warn!("discarding stale people load");
            return false;
        }
        self.replace_people(data);
        true
    }

    // --- lookups ---------------------------------------------------------

    pub fn schools(&self) -> &[School] {
        &self.schools
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn classrooms(&self) -> &[Classroom] {
        &self.classrooms
    }

    pub fn people(&self) -> &[User] {
        &self.people
    }

    pub fn school(&self, id: SchoolId) -> Option<&School> {
        self.school_index.get(&id).map(|&i| &self.schools[i])
    }

    pub fn subject(&self, id: SubjectId) -> Option<&Subject> {
        self.subject_index.get(&id).map(|&i| &self.subjects[i])
    }

    pub fn classroom(&self, id: ClassroomId) -> Option<&Classroom> {
        self.classroom_index.get(&id).map(|&i| &self.classrooms[i])
    }

    pub fn person(&self, id: &str) -> Option<&User> {
        self.person_index.get(id).map(|&i| &self.people[i])
    }

    pub fn school_name(&self, id: SchoolId) -> Option<&str> {
        self.school(id).map(|s| s.name.as_str())
    }

    pub fn subject_name(&self, id: SubjectId) -> Option<&str> {
        self.subject(id).map(|s| s.name.as_str())
    }

    pub fn classroom_name(&self, id: ClassroomId) -> Option<&str> {
        self.classroom(id).map(|c| c.name.as_str())
    }

    // --- derived views ---------------------------------------------------

    pub fn subjects_of(&self, school: SchoolId) -> Vec<&Subject> {
        self.subjects.iter().filter(|s| s.school_id == school).collect()
    }

    pub fn classrooms_of(&self, school: SchoolId) -> Vec<&Classroom> {
        self.classrooms.iter().filter(|c| c.school_id == school).collect()
    }

    pub fn teachers_of(&self, school: SchoolId) -> Vec<&User> {
        self.people
            .iter()
            .filter(|p| p.role == Role::Teacher && p.school_id == Some(school))
            .collect()
    }

    pub fn students_of_classroom(&self, classroom: ClassroomId) -> Vec<&User> {
        self.people
            .iter()
            .filter(|p| p.role == Role::Student && p.classroom_id == Some(classroom))
            .collect()
    }

    // --- viewer scoping ---------------------------------------------------

    /// Effective institution filter for a loader call. Non-admin viewers are
    /// pinned to their own institution regardless of what the UI layer asked
    /// for; the remote service enforces the same rule. A non-admin without a
    /// linked institution gets no scope at all rather than a network-wide one.
    pub fn scope_for(viewer: &User, requested: Option<SchoolId>) -> Result<Option<SchoolId>, ApiError> {
        match viewer.role {
            Role::Admin => Ok(requested),
            _ => match viewer.school_id {
                Some(own) => Ok(Some(own)),
                None => Err(ApiError::Forbidden(
                    "Seu perfil não está vinculado a uma unidade escolar".to_string(),
                )),
            },
        }
    }

    // --- local dependency checks ------------------------------------------

    /// Human-readable blockers for deleting a school, per the local view.
    /// The remote store is still the final arbiter and may answer 409.
    pub fn school_dependents(&self, id: SchoolId) -> Vec<String> {
        let mut blockers = Vec::new();
        let subjects = self.subjects_of(id).len();
        if subjects > 0 {
            blockers.push(format!("{subjects} matéria(s) vinculada(s)"));
        }
        let classrooms = self.classrooms_of(id).len();
        if classrooms > 0 {
            blockers.push(format!("{classrooms} turma(s) vinculada(s)"));
        }
        let members = self
            .people
            .iter()
            .filter(|p| p.school_id == Some(id))
            .count();
        if members > 0 {
            blockers.push(format!("{members} usuário(s) vinculado(s)"));
        }
        blockers
    }

    pub fn subject_dependents(&self, id: SubjectId) -> Vec<String> {
        let mut blockers = Vec::new();
        let classrooms = self
            .classrooms
            .iter()
            .filter(|c| c.subject_ids.contains(&id))
            .count();
        if classrooms > 0 {
            blockers.push(format!("{classrooms} turma(s) ensinam esta matéria"));
        }
        let teachers = self
            .people
            .iter()
            .filter(|p| p.teachable_subject_ids.contains(&id))
            .count();
        if teachers > 0 {
            blockers.push(format!("{teachers} professor(es) habilitado(s)"));
        }
        blockers
    }

    pub fn classroom_dependents(&self, id: ClassroomId) -> Vec<String> {
        let students = self.students_of_classroom(id).len();
        if students > 0 {
            vec![format!("{students} aluno(s) matriculado(s)")]
        } else {
            Vec::new()
        }
    }

    // --- invariant predicates --------------------------------------------

    /// Classroom belongs to the given school.
    pub fn classroom_in_school(&self, classroom: ClassroomId, school: SchoolId) -> bool {
        self.classroom(classroom)
            .map(|c| c.school_id == school)
            .unwrap_or(false)
    }

    /// Subject belongs to the given school.
    pub fn subject_in_school(&self, subject: SubjectId, school: SchoolId) -> bool {
        self.subject(subject)
            .map(|s| s.school_id == school)
            .unwrap_or(false)
    }

    /// Teacher may be assigned to the subject inside the classroom: must be
    /// a teacher of the classroom's school and eligible for the subject.
    pub fn teacher_eligible(&self, teacher: &str, subject: SubjectId, classroom: ClassroomId) -> bool {
        let Some(room) = self.classroom(classroom) else {
            return false;
        };
        let Some(person) = self.person(teacher) else {
            return false;
        };
        person.role == Role::Teacher
            && person.school_id == Some(room.school_id)
            && person.teachable_subject_ids.contains(&subject)
    }
}

/// Load every collection for a screen. The four reads run concurrently and
/// fail independently: one broken collection never blocks the others, and
/// each failure is reported next to the collection it belongs to.
pub async fn load_directory(
    api: &ApiClient,
    viewer: &User,
    requested: Option<SchoolId>,
) -> (Directory, Vec<(&'static str, ApiError)>) {
    let scope = match Directory::scope_for(viewer, requested) {
        Ok(scope) => scope,
        Err(err) => return (Directory::new(), vec![("scope", err)]),
    };
    let (schools, subjects, classrooms, people) = tokio::join!(
        api.list_schools(),
        api.list_subjects(scope),
        api.list_classrooms(scope),
        api.list_users(None, scope),
    );

    let mut directory = Directory::new();
    let mut failures = Vec::new();
    match schools {
        Ok(data) => directory.replace_schools(data),
        Err(err) => failures.push(("schools", err)),
    }
    match subjects {
        Ok(data) => directory.replace_subjects(data),
        Err(err) => failures.push(("subjects", err)),
    }
    match classrooms {
        Ok(data) => directory.replace_classrooms(data),
        Err(err) => failures.push(("classrooms", err)),
    }
    match people {
        Ok(data) => directory.replace_people(data),
        Err(err) => failures.push(("people", err)),
    }
    (directory, failures)
}
