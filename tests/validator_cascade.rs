mod test_support;

use insightclass_console::forms::{
    classroom_form_errors, eligible_teachers, required_fields, validate_assignments, PersonForm,
};
use insightclass_console::model::{AssignmentEntry, ClassroomAssignments, Role};
use test_support::{admin, directory_fixture, manager};

fn filled_student_form() -> PersonForm {
    let mut form = PersonForm::empty(Role::Student);
    let base = form.base_mut();
    base.full_name = "Ana Souza".to_string();
    base.email = "ana@escola.example".to_string();
    base.password = "segredo9".to_string();
    form
}

#[test]
fn required_fields_grow_with_role() {
    assert_eq!(
        required_fields(Role::Admin),
        &["full_name", "email", "password"][..]
    );
    assert!(required_fields(Role::Manager).contains(&"school_id"));
    assert!(required_fields(Role::Teacher).contains(&"teachable_subject_ids"));
    assert!(required_fields(Role::Student).contains(&"classroom_id"));
}

#[test]
fn changing_school_clears_classroom_from_the_old_school() {
    let directory = directory_fixture();
    let mut form = filled_student_form();
    form.set_school(Some(1), &directory);
    if let PersonForm::Student { classroom, .. } = &mut form {
        *classroom = Some(100);
    }
    assert!(form.validate(&directory, &admin("adm1")).is_empty());

    // Moving to school 2 drops the school-1 classroom; submission is
    // blocked until a classroom of school 2 is chosen.
    form.set_school(Some(2), &directory);
    if let PersonForm::Student { classroom, .. } = &form {
        assert_eq!(*classroom, None);
    } else {
        panic!("student form expected");
    }
    let errors = form.validate(&directory, &admin("adm1"));
    assert!(errors.iter().any(|e| e.field == "classroom_id"));

    if let PersonForm::Student { classroom, .. } = &mut form {
        *classroom = Some(200);
    }
    assert!(form.validate(&directory, &admin("adm1")).is_empty());
}

#[test]
fn changing_school_intersects_teachable_subjects() {
    let directory = directory_fixture();
    let mut form = PersonForm::empty(Role::Teacher);
    let base = form.base_mut();
    base.full_name = "Caio Lima".to_string();
    base.email = "caio@escola.example".to_string();
    base.password = "segredo9".to_string();
    form.set_school(Some(1), &directory);
    if let PersonForm::Teacher { teachable, .. } = &mut form {
        *teachable = vec![10, 11];
    }
    assert!(form.validate(&directory, &admin("adm1")).is_empty());

    form.set_school(Some(2), &directory);
    if let PersonForm::Teacher { teachable, .. } = &form {
        assert!(teachable.is_empty(), "school-1 subjects must be dropped");
    }
    let errors = form.validate(&directory, &admin("adm1"));
    assert!(errors.iter().any(|e| e.field == "teachable_subject_ids"));
}

#[test]
fn teacher_with_foreign_subject_is_rejected() {
    let directory = directory_fixture();
    let mut form = PersonForm::empty(Role::Teacher);
    let base = form.base_mut();
    base.full_name = "Caio Lima".to_string();
    base.email = "caio@escola.example".to_string();
    base.password = "segredo9".to_string();
    if let PersonForm::Teacher {
        school, teachable, ..
    } = &mut form
    {
        // Bypass the cascade on purpose: subject 20 belongs to school 2.
        *school = Some(1);
        *teachable = vec![20];
    }
    let errors = form.validate(&directory, &admin("adm1"));
    assert!(errors.iter().any(|e| e.field == "teachable_subject_ids"));
}

#[test]
fn password_rules_differ_between_create_and_edit() {
    let directory = directory_fixture();
    let mut form = filled_student_form();
    form.set_school(Some(1), &directory);
    if let PersonForm::Student { classroom, .. } = &mut form {
        *classroom = Some(100);
    }

    form.base_mut().password = "curta".to_string();
    let errors = form.validate(&directory, &admin("adm1"));
    assert!(errors.iter().any(|e| e.field == "password"));

    // Editing: empty means keep the current credential.
    form.base_mut().editing = Some("s1".to_string());
    form.base_mut().password = String::new();
    assert!(form.validate(&directory, &admin("adm1")).is_empty());
    assert_eq!(form.update_payload().password, None);

    // A non-empty replacement still honors the minimum.
    form.base_mut().password = "abc".to_string();
    let errors = form.validate(&directory, &admin("adm1"));
    assert!(errors.iter().any(|e| e.field == "password"));
}

#[test]
fn manager_cannot_target_another_school() {
    let directory = directory_fixture();
    let mut form = filled_student_form();
    form.set_school(Some(2), &directory);
    if let PersonForm::Student { classroom, .. } = &mut form {
        *classroom = Some(200);
    }

    let viewer = manager("g1", 1);
    let errors = form.validate(&directory, &viewer);
    assert!(
        errors
            .iter()
            .any(|e| e.field == "school_id" && e.message.contains("própria unidade")),
        "scope violation must be rejected, not corrected"
    );

    // The same form passes for an administrator.
    assert!(form.validate(&directory, &admin("adm1")).is_empty());
}

#[test]
fn eligible_teachers_intersects_school_and_subject() {
    let directory = directory_fixture();

    // t1 teaches subject 10 at school 1.
    let options = eligible_teachers(&directory, 100, 10);
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].id, "t1");

    // Nobody at school 1 teaches História (11): UI must disable selection.
    assert!(eligible_teachers(&directory, 100, 11).is_empty());

    // t2 is eligible for 20 but belongs to school 2.
    assert!(eligible_teachers(&directory, 100, 20).is_empty());
}

#[test]
fn assignment_validation_rejects_ineligible_and_foreign_teachers() {
    let directory = directory_fixture();

    let valid = ClassroomAssignments {
        classroom_id: 100,
        assignments: vec![
            AssignmentEntry {
                subject_id: 10,
                teacher_id: Some("t1".to_string()),
            },
            AssignmentEntry {
                subject_id: 11,
                teacher_id: None,
            },
        ],
    };
    assert!(validate_assignments(&valid, &directory).is_empty());

    let foreign_teacher = ClassroomAssignments {
        classroom_id: 100,
        assignments: vec![AssignmentEntry {
            subject_id: 10,
            teacher_id: Some("t2".to_string()),
        }],
    };
    assert!(!validate_assignments(&foreign_teacher, &directory).is_empty());

    let subject_not_in_classroom = ClassroomAssignments {
        classroom_id: 200,
        assignments: vec![AssignmentEntry {
            subject_id: 10,
            teacher_id: None,
        }],
    };
    assert!(!validate_assignments(&subject_not_in_classroom, &directory).is_empty());
}

#[test]
fn classroom_form_requires_subjects_of_its_school() {
    let directory = directory_fixture();
    let viewer = admin("adm1");

    assert!(classroom_form_errors("Turma C", Some(1), &[10], &viewer, &directory).is_empty());

    let no_subjects = classroom_form_errors("Turma C", Some(1), &[], &viewer, &directory);
    assert!(no_subjects.iter().any(|e| e.field == "subject_ids"));

    let foreign = classroom_form_errors("Turma C", Some(1), &[20], &viewer, &directory);
    assert!(foreign.iter().any(|e| e.field == "subject_ids"));

    let scoped = classroom_form_errors("Turma C", Some(2), &[20], &manager("g1", 1), &directory);
    assert!(scoped.iter().any(|e| e.field == "school_id"));
}
