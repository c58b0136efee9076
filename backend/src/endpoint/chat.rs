use super::tools::*;

use futures::StreamExt;
use grpc::backend::chat_server::*;
use tokio_stream::wrappers::ReceiverStream;

use crate::entity::chat::{Author, *};
use crate::entity::{assignment, enrollment, problem};

const REPLY_CHANNEL_SIZE: usize = 16;

impl From<Model> for ChatMessage {
    fn from(model: Model) -> Self {
        ChatMessage {
            id: model.id,
            role: (match Author::try_from(model.role) {
                Ok(Author::Coach) => ChatRole::Coach,
                _ => ChatRole::Student,
            }) as i32,
            payload: model.payload,
            create_at: Some(into_prost(model.create_at)),
        }
    }
}

/// pull the message text out of a client payload
fn payload_text(payload: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(payload)
        .ok()?
        .get("text")?
        .as_str()
        .map(ToOwned::to_owned)
}

#[async_trait]
impl Chat for ArcServer {
    type sendStream = TonicStream<ChatReply>;

    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Chat/send",
        err(level = "debug", Display)
    )]
    async fn send(
        &self,
        req: Request<SendChatRequest>,
    ) -> Result<Response<Self::sendStream>, Status> {
        let (auth, req) = self
            .parse_request_n(req, NonZeroU32!(30))
            .in_current_span()
            .await?;
        let (user_id, _) = auth.assume_login()?;

        req.bound_check()?;

        // a fresh message must parse, tolerance for malformed payloads
        // only applies to stored history
        let text = payload_text(&req.payload).ok_or(Error::BadArgument("payload"))?;

        enrollment::Entity::find()
            .filter(enrollment::Column::ClassroomId.eq(req.classroom_id))
            .filter(enrollment::Column::UserId.eq(user_id))
            .one(self.db.deref())
            .await
            .map_err(Into::<Error>::into)?
            .ok_or(Error::PermissionDeny("not enrolled in this classroom"))?;

        let pairing =
            assignment::Entity::by_pairing(req.classroom_id, req.problem_id, self.db.deref())
                .await?;
        self.coach
            .check_quota(user_id, pairing.ai_level)
            .map_err(Into::<Error>::into)?;

        let problem = problem::Entity::find_by_id(req.problem_id)
            .one(self.db.deref())
            .await
            .map_err(Into::<Error>::into)?
            .ok_or(Error::NotInDB)?;

        let thread = Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::ClassroomId.eq(req.classroom_id))
            .filter(Column::ProblemId.eq(req.problem_id))
            .order_by_asc(Column::CreateAt)
            .all(self.db.deref())
            .await
            .map_err(Into::<Error>::into)?;

        let mut history: Vec<(Author, String)> = thread
            .iter()
            .filter_map(|row| {
                let author = Author::try_from(row.role).ok()?;
                Some((author, payload_text(&row.payload)?))
            })
            .collect();
        history.push((Author::Student, text));

        // the student turn lands before the upstream call, an upstream
        // failure must not lose it
        ActiveModel {
            user_id: ActiveValue::Set(user_id),
            problem_id: ActiveValue::Set(req.problem_id),
            classroom_id: ActiveValue::Set(req.classroom_id),
            role: ActiveValue::Set(Author::Student.into()),
            payload: ActiveValue::Set(req.payload.clone()),
            create_at: ActiveValue::Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(self.db.deref())
        .instrument(info_span!("save").or_current())
        .await
        .map_err(Into::<Error>::into)?;

        let mut upstream = self
            .coach
            .reply(pairing.ai_level, &problem.content, &history)
            .in_current_span()
            .await
            .map_err(Into::<Error>::into)?;

        let db = self.db.clone();
        let (classroom_id, problem_id) = (req.classroom_id, req.problem_id);
        let (tx, rx) = tokio::sync::mpsc::channel(REPLY_CHANNEL_SIZE);
        tokio::spawn(async move {
            let mut full = String::new();
            while let Some(item) = upstream.next().await {
                match item {
                    Ok(delta) => {
                        full.push_str(&delta);
                        if tx.send(Ok(ChatReply { delta })).await.is_err() {
                            // client hung up, still persist what arrived
                            break;
                        }
                    }
                    Err(err) => {
                        tx.send(Err(err.into())).await.ok();
                        break;
                    }
                }
            }
            if full.is_empty() {
                return;
            }
            let payload = serde_json::json!({ "text": full }).to_string();
            let saved = ActiveModel {
                user_id: ActiveValue::Set(user_id),
                problem_id: ActiveValue::Set(problem_id),
                classroom_id: ActiveValue::Set(classroom_id),
                role: ActiveValue::Set(Author::Coach.into()),
                payload: ActiveValue::Set(payload),
                create_at: ActiveValue::Set(chrono::Utc::now().naive_utc()),
                ..Default::default()
            }
            .insert(db.as_ref())
            .await;
            if let Err(err) = saved {
                tracing::warn!(msg = err.to_string(), "coach_turn_persist");
            }
        });

        Ok(Response::new(
            Box::pin(ReceiverStream::new(rx)) as Self::sendStream
        ))
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Chat/history",
        err(level = "debug", Display)
    )]
    async fn history(
        &self,
        req: Request<ChatHistoryRequest>,
    ) -> Result<Response<ChatHistoryResponse>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;
        let (user_id, _) = auth.assume_login()?;

        let target = req.user_id.unwrap_or(user_id);
        if target != user_id {
            // reading someone else's thread is a host privilege
            crate::entity::classroom::Entity::write_by_id(req.classroom_id, &auth)?
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;
        }

        let list = Entity::find()
            .filter(Column::UserId.eq(target))
            .filter(Column::ClassroomId.eq(req.classroom_id))
            .filter(Column::ProblemId.eq(req.problem_id))
            .order_by_asc(Column::CreateAt)
            .all(self.db.deref())
            .await
            .map_err(Into::<Error>::into)?;

        Ok(Response::new(ChatHistoryResponse {
            list: list.into_iter().map(Into::into).collect(),
        }))
    }
}
