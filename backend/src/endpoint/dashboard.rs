use super::tools::*;

use grpc::backend::dashboard_server::*;

use crate::config::CONFIG;
use crate::dashboard::{self, KeywordScanner, SortOrder, ViewQuery};
use crate::entity::chat::Author;
use crate::entity::{assignment, chat, classroom, enrollment, problem, submit, user};

fn status_into(status: dashboard::CellStatus) -> i32 {
    (match status {
        dashboard::CellStatus::NotAttempted => CellStatus::NotAttempted,
        dashboard::CellStatus::InProgress => CellStatus::InProgress,
        dashboard::CellStatus::Failed => CellStatus::Failed,
        dashboard::CellStatus::Passed => CellStatus::Passed,
    }) as i32
}

#[async_trait]
impl Dashboard for ArcServer {
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Dashboard/matrix",
        err(level = "debug", Display)
    )]
    async fn matrix(&self, req: Request<MatrixRequest>) -> Result<Response<MatrixResponse>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        req.bound_check()?;

        // host(or admin) only view
        classroom::Entity::write_by_id(req.classroom_id, &auth)?
            .one(self.db.deref())
            .await
            .map_err(Into::<Error>::into)?
            .ok_or(Error::NotInDB)?;

        let db = self.db.deref();

        // the four lookups, any failure fails the whole request, a
        // partial grid would misrepresent student standing
        let problems: Vec<dashboard::ProblemRow> = assignment::Entity::find()
            .filter(assignment::Column::ClassroomId.eq(req.classroom_id))
            .find_also_related(problem::Entity)
            .order_by_asc(assignment::Column::Sequence)
            .all(db)
            .in_current_span()
            .await
            .map_err(Into::<Error>::into)?
            .into_iter()
            .filter_map(|(_, problem)| problem)
            .map(|problem| dashboard::ProblemRow {
                id: problem.id,
                title: problem.title,
                difficulty: problem.difficulty,
                category: problem.category,
            })
            .collect();

        let students: Vec<dashboard::StudentRow> = enrollment::Entity::find()
            .filter(enrollment::Column::ClassroomId.eq(req.classroom_id))
            .find_also_related(user::Entity)
            .order_by_asc(enrollment::Column::RosterNumber)
            .order_by_asc(user::Column::DisplayName)
            .all(db)
            .in_current_span()
            .await
            .map_err(Into::<Error>::into)?
            .into_iter()
            .filter_map(|(enrollment, user)| {
                user.map(|user| dashboard::StudentRow {
                    id: user.id,
                    display_name: user.display_name,
                    roster_number: enrollment.roster_number,
                })
            })
            .collect();

        let submissions: Vec<dashboard::SubmissionRow> = submit::Entity::find()
            .filter(submit::Column::ClassroomId.eq(req.classroom_id))
            .filter(submit::Column::Committed.eq(true))
            .all(db)
            .in_current_span()
            .await
            .map_err(Into::<Error>::into)?
            .into_iter()
            .map(|x| dashboard::SubmissionRow {
                user_id: x.user_id,
                problem_id: x.problem_id,
                accept: x.accept,
                upload_at: x.upload_at,
                score: x.score,
                grade: x.grade,
                has_feedback: x.feedback.is_some(),
            })
            .collect();

        let messages: Vec<dashboard::MessageRow> = chat::Entity::find()
            .filter(chat::Column::ClassroomId.eq(req.classroom_id))
            .all(db)
            .in_current_span()
            .await
            .map_err(Into::<Error>::into)?
            .into_iter()
            .map(|x| dashboard::MessageRow {
                user_id: x.user_id,
                problem_id: x.problem_id,
                student_authored: x.role == Author::Student as i32,
                payload: x.payload,
            })
            .collect();

        let scanner = KeywordScanner::from_config();
        let matrix = dashboard::build(problems, students, &submissions, &messages, &scanner);

        let query = ViewQuery {
            search: req.search.as_deref(),
            struggling_only: req.struggling_only,
            cheating_only: req.cheating_only,
            sort: req.sort_problem_id.map(|problem_id| {
                (
                    problem_id,
                    match req.sort_order() {
                        Order::Ascend => SortOrder::Ascend,
                        Order::Descend => SortOrder::Descend,
                    },
                )
            }),
            struggling_percent: CONFIG.dashboard.struggling_percent,
        };
        let rows = matrix.view(&query);

        let mut students = Vec::with_capacity(rows.len());
        let mut cells = Vec::with_capacity(rows.len() * matrix.problems.len());
        for &row in &rows {
            let student = &matrix.students[row];
            students.push(StudentInfo {
                id: student.id,
                display_name: student.display_name.clone(),
                roster_number: student.roster_number,
            });
            for problem in &matrix.problems {
                let cell = matrix.cell(student.id, problem.id);
                cells.push(CellRecord {
                    student_id: student.id,
                    problem_id: problem.id,
                    status: status_into(cell.status),
                    ai_used: cell.ai_used,
                    ai_message_count: cell.ai_message_count,
                    cheating_flag: cell.cheating_flag,
                    teacher_score: cell.teacher_score,
                    teacher_grade: cell.teacher_grade.clone(),
                    has_feedback: cell.has_feedback,
                });
            }
        }

        Ok(Response::new(MatrixResponse {
            problems: matrix
                .problems
                .iter()
                .map(|x| ProblemCol {
                    id: x.id,
                    title: x.title.clone(),
                    difficulty: x.difficulty,
                    category: x.category.clone(),
                })
                .collect(),
            students,
            cells,
        }))
    }
}
