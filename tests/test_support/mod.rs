#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use insightclass_console::model::{
    Classroom, ClassroomId, Feedback, Role, School, SchoolId, Subject, SubjectId, TargetKind, User,
};
use insightclass_console::Directory;

pub fn school(id: SchoolId, name: &str) -> School {
    School {
        id,
        name: name.to_string(),
        code: None,
    }
}

pub fn subject(id: SubjectId, school_id: SchoolId, name: &str) -> Subject {
    Subject {
        id,
        name: name.to_string(),
        code: None,
        color: None,
        description: None,
        school_id,
        teacher_id: None,
    }
}

pub fn classroom(
    id: ClassroomId,
    school_id: SchoolId,
    name: &str,
    subject_ids: &[SubjectId],
) -> Classroom {
    Classroom {
        id,
        name: name.to_string(),
        code: None,
        school_id,
        subject_ids: subject_ids.to_vec(),
    }
}

fn person(id: &str, role: Role, school_id: Option<SchoolId>) -> User {
    User {
        id: id.to_string(),
        email: format!("{id}@escola.example"),
        full_name: format!("Pessoa {id}"),
        role,
        school_id,
        classroom_id: None,
        teachable_subject_ids: Vec::new(),
        teaching_classroom_ids: Vec::new(),
    }
}

pub fn admin(id: &str) -> User {
    person(id, Role::Admin, None)
}

pub fn manager(id: &str, school_id: SchoolId) -> User {
    person(id, Role::Manager, Some(school_id))
}

pub fn teacher(id: &str, school_id: SchoolId, teachable: &[SubjectId]) -> User {
    let mut user = person(id, Role::Teacher, Some(school_id));
    user.teachable_subject_ids = teachable.to_vec();
    user
}

pub fn student(id: &str, school_id: SchoolId, classroom_id: ClassroomId) -> User {
    let mut user = person(id, Role::Student, Some(school_id));
    user.classroom_id = Some(classroom_id);
    user
}

/// Minimal feedback event for aggregation and alert fixtures.
pub fn event(
    id: i64,
    sender: &str,
    target_type: TargetKind,
    target: &str,
    sentiment_label: Option<&str>,
) -> Feedback {
    Feedback {
        id,
        sender_id: sender.to_string(),
        sender_name: None,
        sender_role: None,
        sender_email: None,
        sender_school_id: None,
        target_type,
        target_id: target.to_string(),
        target_name: None,
        target_role: None,
        target_email: None,
        target_school_id: None,
        content: "conteúdo".to_string(),
        sentiment: sentiment_label.map(|s| s.to_string()),
        category: None,
        sentiment_label: sentiment_label.map(|s| s.to_string()),
        sentiment_score: None,
        has_trigger: false,
        manual_trigger_reason: None,
        manual_triggered_by: None,
        trigger_resolved_at: None,
        trigger_resolved_by: None,
        trigger_resolved_note: None,
        created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
    }
}

pub fn triggered(mut fb: Feedback) -> Feedback {
    fb.has_trigger = true;
    fb
}

pub fn resolved(mut fb: Feedback) -> Feedback {
    fb.has_trigger = true;
    fb.trigger_resolved_at = Some(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap());
    fb
}

/// Two schools with disjoint subjects, classrooms and staff:
///   school 1: subjects 10, 11; classroom 100 (teaches 10, 11)
///   school 2: subjects 20;     classroom 200 (teaches 20)
/// Teachers: t1 (school 1, teaches 10), t2 (school 2, teaches 20).
/// Students: s1 in classroom 100.
pub fn directory_fixture() -> Directory {
    let mut directory = Directory::new();
    directory.replace_schools(vec![school(1, "Escola Azul"), school(2, "Escola Verde")]);
    directory.replace_subjects(vec![
        subject(10, 1, "Matemática"),
        subject(11, 1, "História"),
        subject(20, 2, "Ciências"),
    ]);
    directory.replace_classrooms(vec![
        classroom(100, 1, "Turma A", &[10, 11]),
        classroom(200, 2, "Turma B", &[20]),
    ]);
    directory.replace_people(vec![
        admin("adm1"),
        manager("g1", 1),
        teacher("t1", 1, &[10]),
        teacher("t2", 2, &[20]),
        student("s1", 1, 100),
    ]);
    directory
}
