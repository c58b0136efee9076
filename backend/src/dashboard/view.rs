//! sort and filter predicates over a built matrix
//!
//! Filters conjoin, search narrows first, sorting runs last over
//! whatever survived.

use std::cmp::Reverse;

use super::{cell::CellStatus, Matrix};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Ascend,
    Descend,
}

/// caller's view of the grid, thresholds injected rather than read
/// from ambient state
#[derive(Debug)]
pub struct ViewQuery<'a> {
    pub search: Option<&'a str>,
    pub struggling_only: bool,
    pub cheating_only: bool,
    /// column sort, `None` keeps roster order
    pub sort: Option<(i32, SortOrder)>,
    pub struggling_percent: u32,
}

impl Default for ViewQuery<'_> {
    fn default() -> Self {
        Self {
            search: None,
            struggling_only: false,
            cheating_only: false,
            sort: None,
            struggling_percent: 30,
        }
    }
}

/// column sort weight, lower sorts first in ascending order:
/// cheating, failed, passed with coach help, passed unaided,
/// open chat, untouched
pub(super) fn column_weight(matrix: &Matrix, student_id: i32, problem_id: i32) -> u8 {
    let cell = matrix.cell(student_id, problem_id);
    if cell.cheating_flag {
        return 0;
    }
    match cell.status {
        CellStatus::Failed => 1,
        CellStatus::Passed if cell.ai_used => 2,
        CellStatus::Passed => 3,
        CellStatus::InProgress => 4,
        CellStatus::NotAttempted => 5,
    }
}

impl Matrix {
    fn passed_count(&self, student_id: i32) -> usize {
        self.problems
            .iter()
            .filter(|p| self.cell(student_id, p.id).status == CellStatus::Passed)
            .count()
    }
    fn any_cheating(&self, student_id: i32) -> bool {
        self.problems
            .iter()
            .any(|p| self.cell(student_id, p.id).cheating_flag)
    }
    /// indices into `students`, filtered and ordered for display
    ///
    /// The roster comes in roster-number order and every sort here is
    /// stable, so equal weights keep the roster tie-break for free.
    pub fn view(&self, query: &ViewQuery) -> Vec<usize> {
        let mut rows: Vec<usize> = (0..self.students.len()).collect();

        if let Some(needle) = query.search.filter(|x| !x.is_empty()) {
            let needle = needle.to_lowercase();
            rows.retain(|&i| {
                let student = &self.students[i];
                student.display_name.to_lowercase().contains(&needle)
                    || student.roster_number.to_string().contains(&needle)
            });
        }
        if query.struggling_only {
            // strictly below the percentage, 30% of 10 means 3 passes is enough
            let assigned = self.problems.len();
            rows.retain(|&i| {
                let passed = self.passed_count(self.students[i].id);
                (passed * 100) < (query.struggling_percent as usize) * assigned
            });
        }
        if query.cheating_only {
            rows.retain(|&i| self.any_cheating(self.students[i].id));
        }

        if let Some((problem_id, order)) = query.sort {
            match order {
                SortOrder::Ascend => rows.sort_by_key(|&i| {
                    column_weight(self, self.students[i].id, problem_id)
                }),
                SortOrder::Descend => rows.sort_by_key(|&i| {
                    Reverse(column_weight(self, self.students[i].id, problem_id))
                }),
            }
        }

        rows
    }
}

#[cfg(test)]
mod test {
    use super::super::{build, MessageRow, ProblemRow, StudentRow, SubmissionRow};
    use super::*;
    use crate::dashboard::KeywordScanner;

    fn student(id: i32, name: &str, roster: u32) -> StudentRow {
        StudentRow {
            id,
            display_name: name.to_owned(),
            roster_number: roster,
        }
    }

    fn problem(id: i32) -> ProblemRow {
        ProblemRow {
            id,
            title: format!("P{}", id),
            difficulty: 2,
            category: "loops".to_owned(),
        }
    }

    fn submit(user_id: i32, problem_id: i32, accept: bool) -> SubmissionRow {
        SubmissionRow {
            user_id,
            problem_id,
            accept,
            upload_at: chrono::NaiveDateTime::default(),
            score: None,
            grade: None,
            has_feedback: false,
        }
    }

    fn message(user_id: i32, problem_id: i32, text: &str) -> MessageRow {
        MessageRow {
            user_id,
            problem_id,
            student_authored: true,
            payload: format!(r#"{{"text": "{}"}}"#, text),
        }
    }

    fn scanner() -> KeywordScanner {
        KeywordScanner::new(&["정답 알려".to_owned(), "코드 줘".to_owned()])
    }

    #[test]
    fn struggling_boundary() {
        let problems: Vec<_> = (1..=10).map(problem).collect();
        let students = vec![student(1, "two-passes", 1), student(2, "three-passes", 2)];
        let mut submissions = vec![];
        for p in 1..=2 {
            submissions.push(submit(1, p, true));
        }
        for p in 1..=3 {
            submissions.push(submit(2, p, true));
        }
        let matrix = build(problems, students, &submissions, &[], &scanner());

        let rows = matrix.view(&ViewQuery {
            struggling_only: true,
            ..Default::default()
        });
        // 2/10 = 20% qualifies, 3/10 = 30% does not
        assert_eq!(rows, vec![0]);
    }

    #[test]
    fn column_sort_weight_order() {
        let problems = vec![problem(1)];
        let students = vec![
            student(1, "untouched", 1),
            student(2, "self-pass", 2),
            student(3, "ai-pass", 3),
            student(4, "failed", 4),
            student(5, "cheater", 5),
        ];
        let submissions = vec![
            submit(2, 1, true),
            submit(3, 1, true),
            submit(4, 1, false),
            submit(5, 1, false),
        ];
        let messages = vec![message(3, 1, "힌트 좀"), message(5, 1, "정답 알려줘")];
        let matrix = build(problems, students, &submissions, &messages, &scanner());

        let rows = matrix.view(&ViewQuery {
            sort: Some((1, SortOrder::Ascend)),
            ..Default::default()
        });
        // cheating, failed, ai-assisted pass, unaided pass, untouched
        assert_eq!(rows, vec![4, 3, 2, 1, 0]);

        let rows = matrix.view(&ViewQuery {
            sort: Some((1, SortOrder::Descend)),
            ..Default::default()
        });
        assert_eq!(rows, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn column_sort_is_stable() {
        let problems = vec![problem(1)];
        let students = vec![
            student(10, "a", 1),
            student(11, "b", 2),
            student(12, "c", 3),
        ];
        let submissions = vec![submit(10, 1, false), submit(11, 1, false)];
        let matrix = build(problems, students, &submissions, &[], &scanner());

        let rows = matrix.view(&ViewQuery {
            sort: Some((1, SortOrder::Ascend)),
            ..Default::default()
        });
        // both failed students keep roster order
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn search_then_filter_conjunction() {
        let problems: Vec<_> = (1..=2).map(problem).collect();
        let students = vec![
            student(1, "김철수", 1),
            student(2, "김영희", 2),
            student(3, "박민준", 3),
        ];
        // 김영희 passed everything, the others passed nothing
        let submissions = vec![submit(2, 1, true), submit(2, 2, true)];
        let matrix = build(problems, students, &submissions, &[], &scanner());

        let rows = matrix.view(&ViewQuery {
            search: Some("김"),
            struggling_only: true,
            ..Default::default()
        });
        assert_eq!(rows, vec![0]);
    }

    #[test]
    fn search_by_roster_number() {
        let problems = vec![problem(1)];
        let students = vec![student(1, "a", 12), student(2, "b", 24)];
        let matrix = build(problems, students, &[], &[], &scanner());

        let rows = matrix.view(&ViewQuery {
            search: Some("24"),
            ..Default::default()
        });
        assert_eq!(rows, vec![1]);
    }

    #[test]
    fn cheating_filter() {
        let problems = vec![problem(1), problem(2)];
        let students = vec![student(1, "a", 1), student(2, "b", 2)];
        let messages = vec![message(1, 2, "코드 줘")];
        let matrix = build(problems, students, &[], &messages, &scanner());

        let rows = matrix.view(&ViewQuery {
            cheating_only: true,
            ..Default::default()
        });
        assert_eq!(rows, vec![0]);
    }
}
