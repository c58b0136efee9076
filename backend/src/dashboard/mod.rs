//! teacher dashboard progress matrix
//!
//! A pure derivation: roster, assigned problems, committed submissions
//! and coach threads go in, a per-(student, problem) cell grid comes
//! out. Nothing here touches the database or holds state between
//! requests, the grid is recomputed fresh every time.

pub mod cell;
pub mod keyword;
pub mod view;

pub use cell::{CellRecord, CellStatus, ProgressEvent};
pub use keyword::KeywordScanner;
pub use view::{SortOrder, ViewQuery};

use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct StudentRow {
    pub id: i32,
    pub display_name: String,
    pub roster_number: u32,
}

#[derive(Clone, Debug)]
pub struct ProblemRow {
    pub id: i32,
    pub title: String,
    pub difficulty: u32,
    pub category: String,
}

#[derive(Clone, Debug)]
pub struct SubmissionRow {
    pub user_id: i32,
    pub problem_id: i32,
    pub accept: bool,
    pub upload_at: chrono::NaiveDateTime,
    pub score: Option<u32>,
    pub grade: Option<String>,
    pub has_feedback: bool,
}

#[derive(Clone, Debug)]
pub struct MessageRow {
    pub user_id: i32,
    pub problem_id: i32,
    pub student_authored: bool,
    pub payload: String,
}

pub struct Matrix {
    pub problems: Vec<ProblemRow>,
    pub students: Vec<StudentRow>,
    cells: HashMap<(i32, i32), CellRecord>,
}

static EMPTY_CELL: CellRecord = CellRecord {
    status: CellStatus::NotAttempted,
    ai_used: false,
    ai_message_count: None,
    cheating_flag: false,
    teacher_score: None,
    teacher_grade: None,
    has_feedback: false,
};

impl Matrix {
    pub fn cell(&self, student_id: i32, problem_id: i32) -> &CellRecord {
        self.cells.get(&(student_id, problem_id)).unwrap_or(&EMPTY_CELL)
    }
}

/// derive the full grid
///
/// Rows referencing users or problems outside the given roster and
/// assignment set(leftovers of unenrollment or revocation) are ignored.
pub fn build(
    problems: Vec<ProblemRow>,
    students: Vec<StudentRow>,
    submissions: &[SubmissionRow],
    messages: &[MessageRow],
    scanner: &KeywordScanner,
) -> Matrix {
    let mut submissions_by: HashMap<(i32, i32), Vec<&SubmissionRow>> = HashMap::new();
    for row in submissions {
        submissions_by
            .entry((row.user_id, row.problem_id))
            .or_default()
            .push(row);
    }
    let mut messages_by: HashMap<(i32, i32), Vec<&MessageRow>> = HashMap::new();
    for row in messages {
        messages_by
            .entry((row.user_id, row.problem_id))
            .or_default()
            .push(row);
    }

    let mut cells = HashMap::with_capacity(students.len() * problems.len());
    for student in &students {
        for problem in &problems {
            let key = (student.id, problem.id);
            let subs = submissions_by.get(&key).map(Vec::as_slice).unwrap_or(&[]);
            let msgs = messages_by.get(&key).map(Vec::as_slice).unwrap_or(&[]);

            let mut events: Vec<ProgressEvent> = subs
                .iter()
                .map(|x| ProgressEvent::Submission { accept: x.accept })
                .collect();
            if !msgs.is_empty() {
                events.push(ProgressEvent::Conversation);
            }

            let ai_used = !msgs.is_empty();
            let cheating_flag = msgs
                .iter()
                .filter(|x| x.student_authored)
                .any(|x| scanner.payload_hit(&x.payload));

            // review fields ride on the passing submission when one
            // exists, otherwise on the latest attempt
            let reviewed = subs
                .iter()
                .filter(|x| x.accept)
                .max_by_key(|x| x.upload_at)
                .or_else(|| subs.iter().max_by_key(|x| x.upload_at));

            cells.insert(
                key,
                CellRecord {
                    status: CellStatus::reduce(&events),
                    ai_used,
                    ai_message_count: ai_used.then(|| {
                        msgs.iter().filter(|x| x.student_authored).count() as u32
                    }),
                    cheating_flag,
                    teacher_score: reviewed.and_then(|x| x.score),
                    teacher_grade: reviewed.and_then(|x| x.grade.clone()),
                    has_feedback: reviewed.map(|x| x.has_feedback).unwrap_or(false),
                },
            );
        }
    }

    Matrix {
        problems,
        students,
        cells,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classroom_example() {
        let problems = vec![
            ProblemRow {
                id: 1,
                title: "P1".to_owned(),
                difficulty: 1,
                category: "basics".to_owned(),
            },
            ProblemRow {
                id: 2,
                title: "P2".to_owned(),
                difficulty: 2,
                category: "loops".to_owned(),
            },
        ];
        let students = vec![
            StudentRow {
                id: 1,
                display_name: "S1".to_owned(),
                roster_number: 1,
            },
            StudentRow {
                id: 2,
                display_name: "S2".to_owned(),
                roster_number: 2,
            },
        ];
        let submissions = vec![SubmissionRow {
            user_id: 1,
            problem_id: 1,
            accept: true,
            upload_at: chrono::NaiveDateTime::default(),
            score: None,
            grade: None,
            has_feedback: false,
        }];
        let messages = vec![MessageRow {
            user_id: 1,
            problem_id: 2,
            student_authored: true,
            payload: r#"{"text": "힌트 좀 줘"}"#.to_owned(),
        }];
        let scanner = KeywordScanner::new(&["정답 알려".to_owned(), "코드 줘".to_owned()]);

        let matrix = build(problems, students, &submissions, &messages, &scanner);

        let cell = matrix.cell(1, 1);
        assert_eq!(cell.status, CellStatus::Passed);
        assert!(!cell.ai_used);
        assert!(cell.ai_message_count.is_none());

        let cell = matrix.cell(1, 2);
        assert_eq!(cell.status, CellStatus::InProgress);
        assert!(cell.ai_used);
        assert_eq!(cell.ai_message_count, Some(1));
        assert!(!cell.cheating_flag);

        for problem in [1, 2] {
            let cell = matrix.cell(2, problem);
            assert_eq!(cell.status, CellStatus::NotAttempted);
            assert!(!cell.ai_used);
        }
    }

    #[test]
    fn review_fields_prefer_passing_submission() {
        let problems = vec![ProblemRow {
            id: 1,
            title: "P1".to_owned(),
            difficulty: 1,
            category: "basics".to_owned(),
        }];
        let students = vec![StudentRow {
            id: 1,
            display_name: "S1".to_owned(),
            roster_number: 1,
        }];
        let t0 = chrono::NaiveDateTime::default();
        let submissions = vec![
            SubmissionRow {
                user_id: 1,
                problem_id: 1,
                accept: true,
                upload_at: t0,
                score: Some(95),
                grade: Some("A".to_owned()),
                has_feedback: true,
            },
            // later failing attempt carries no review
            SubmissionRow {
                user_id: 1,
                problem_id: 1,
                accept: false,
                upload_at: t0 + chrono::Duration::hours(1),
                score: None,
                grade: None,
                has_feedback: false,
            },
        ];
        let scanner = KeywordScanner::new(&[]);
        let matrix = build(problems, students, &submissions, &[], &scanner);

        let cell = matrix.cell(1, 1);
        assert_eq!(cell.status, CellStatus::Passed);
        assert_eq!(cell.teacher_score, Some(95));
        assert_eq!(cell.teacher_grade.as_deref(), Some("A"));
        assert!(cell.has_feedback);
    }

    #[test]
    fn unknown_pairing_reads_empty() {
        let scanner = KeywordScanner::new(&[]);
        let matrix = build(vec![], vec![], &[], &[], &scanner);
        assert_eq!(matrix.cell(9, 9).status, CellStatus::NotAttempted);
    }
}
