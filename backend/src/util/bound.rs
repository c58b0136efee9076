use super::error::Error;
use grpc::backend::*;
use tracing::instrument;

pub trait BoundCheck {
    /// return true if fail
    fn check(&self) -> bool;
    #[instrument(skip_all, level = "info")]
    fn bound_check(&self) -> Result<(), tonic::Status> {
        if self.check() {
            tracing::warn!(msg = "bound check fail");
            Err(Error::NumberTooLarge.into())
        } else {
            Ok(())
        }
    }
}

impl BoundCheck for LoginRequest {
    fn check(&self) -> bool {
        self.username.len() > 64 || self.password.len() > 256
    }
}

impl BoundCheck for CreateUserRequest {
    fn check(&self) -> bool {
        self.info
            .as_ref()
            .map(|x| x.username.len() > 64 || x.display_name.len() > 64)
            .unwrap_or_default()
            || self.password.len() > 256
    }
}

impl BoundCheck for UpdatePasswordRequest {
    fn check(&self) -> bool {
        self.current.len() > 256 || self.updated.len() > 256
    }
}

impl BoundCheck for CreateClassroomRequest {
    fn check(&self) -> bool {
        self.info
            .as_ref()
            .map(|x| x.title.len() > 128 || x.description.len() > 4 * 1024)
            .unwrap_or_default()
    }
}

impl BoundCheck for UpdateClassroomRequest {
    fn check(&self) -> bool {
        self.title.as_ref().map(String::len).unwrap_or_default() > 128
            || self
                .description
                .as_ref()
                .map(String::len)
                .unwrap_or_default()
                > 4 * 1024
    }
}

impl BoundCheck for JoinClassroomRequest {
    fn check(&self) -> bool {
        self.join_code.len() > 32
    }
}

impl BoundCheck for CreateProblemRequest {
    fn check(&self) -> bool {
        self.info
            .as_ref()
            .map(|x| x.title.len() > 128 || x.category.len() > 64 || x.difficulty > 5)
            .unwrap_or_default()
            || self.content.len() > 128 * 1024
    }
}

impl BoundCheck for UpdateProblemRequest {
    fn check(&self) -> bool {
        self.title.as_ref().map(String::len).unwrap_or_default() > 128
            || self.category.as_ref().map(String::len).unwrap_or_default() > 64
            || self.difficulty.unwrap_or(1) > 5
            || self.content.as_ref().map(String::len).unwrap_or_default() > 128 * 1024
    }
}

impl BoundCheck for GenerateProblemRequest {
    fn check(&self) -> bool {
        self.category.len() > 64 || self.difficulty > 5 || self.brief.len() > 2 * 1024
    }
}

impl BoundCheck for CreateTestcaseRequest {
    fn check(&self) -> bool {
        self.info
            .as_ref()
            .map(|x| x.input.len() > 256 * 1024 || x.output.len() > 256 * 1024)
            .unwrap_or_default()
    }
}

impl BoundCheck for UpdateTestcaseRequest {
    fn check(&self) -> bool {
        self.input.as_ref().map(String::len).unwrap_or_default() > 256 * 1024
            || self.output.as_ref().map(String::len).unwrap_or_default() > 256 * 1024
    }
}

impl BoundCheck for CreateSubmitRequest {
    fn check(&self) -> bool {
        self.code.len() > 64 * 1024
            || self.outputs.len() > 64
            || self.outputs.iter().map(String::len).sum::<usize>() > 256 * 1024
    }
}

impl BoundCheck for ReviewSubmitRequest {
    fn check(&self) -> bool {
        self.score.unwrap_or_default() > 100
            || self.grade.as_ref().map(String::len).unwrap_or_default() > 16
            || self.feedback.as_ref().map(String::len).unwrap_or_default() > 8 * 1024
    }
}

impl BoundCheck for SendChatRequest {
    fn check(&self) -> bool {
        self.payload.len() > 8 * 1024
    }
}

impl BoundCheck for MatrixRequest {
    fn check(&self) -> bool {
        self.search.as_ref().map(String::len).unwrap_or_default() > 64
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn submit_bound() {
        let mut req = CreateSubmitRequest {
            classroom_id: 1,
            problem_id: 1,
            code: "print(1)".to_owned(),
            outputs: vec!["1".to_owned()],
            request_id: None,
        };
        assert!(!req.check());
        req.code = "x".repeat(64 * 1024 + 1);
        assert!(req.check());
    }

    #[test]
    fn review_bound() {
        let req = ReviewSubmitRequest {
            id: 1,
            score: Some(101),
            grade: None,
            feedback: None,
            request_id: None,
        };
        assert!(req.check());
    }
}
