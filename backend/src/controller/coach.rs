//! client for an OpenAI-compatible chat completion upstream
//!
//! The assignment's ai_level picks both the system prompt tier and the
//! per-student daily quota, so what the coach is willing to reveal is a
//! per-assignment teacher decision, not a global one.

use dashmap::DashMap;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Status;
use tracing::instrument;

use crate::config::CONFIG;
use crate::entity::chat::Author;

type Result<T> = std::result::Result<T, Error>;

const REPLY_CHANNEL_SIZE: usize = 16;
/// keep the usage map from growing without bound across days
const USAGE_SWEEP_THRESHOLD: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("coach is disabled for this assignment")]
    Disabled,
    #[error("daily quota exceeded")]
    QuotaExceeded,
    #[error("coach is not configured")]
    NotConfigured,
    #[error("upstream error: `{0}`")]
    Http(#[from] reqwest::Error),
    #[error("malformed upstream reply")]
    MalformedReply,
}

impl From<Error> for Status {
    fn from(value: Error) -> Self {
        match value {
            Error::Disabled => Status::permission_denied("coach is disabled for this assignment"),
            Error::QuotaExceeded => Status::resource_exhausted("daily quota exceeded"),
            Error::NotConfigured => Status::unavailable("coach is not configured"),
            Error::Http(x) => {
                tracing::warn!(msg = x.to_string(), "coach_upstream");
                Status::unavailable("coach upstream unavailable")
            }
            Error::MalformedReply => Status::unavailable("coach upstream unavailable"),
        }
    }
}

/// system prompt tiers, indexed by ai_level(1-4)
///
/// level 0 never reaches the upstream
static PROMPT_TIERS: [&str; 4] = [
    "You are a coding coach for high-school Python students. Only restate \
     the problem in simpler words and point at the relevant concept. Never \
     mention concrete code, never reveal any step of the solution.",
    "You are a coding coach for high-school Python students. You may name \
     the language construct to use and explain it with an unrelated \
     example. Never give code for the actual problem.",
    "You are a coding coach for high-school Python students. You may \
     outline the solution approach step by step in plain language. You may \
     show short fragments(single expressions), never a full solution.",
    "You are a coding coach for high-school Python students. You may walk \
     through a worked example of the same technique on different data and \
     review the student's code line by line. Stop short of pasting a \
     complete solution to the assigned problem.",
];

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}
#[derive(Deserialize)]
struct Choice {
    message: WireReply,
}
#[derive(Deserialize)]
struct WireReply {
    content: String,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}
#[derive(Deserialize)]
struct StreamChoice {
    delta: Delta,
}
#[derive(Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct GeneratedDraft {
    title: String,
    statement: String,
}

pub struct CoachController {
    client: reqwest::Client,
    usage: DashMap<(i32, chrono::NaiveDate), u32>,
}

impl CoachController {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            usage: DashMap::new(),
        }
    }
    fn api_key() -> Result<&'static str> {
        CONFIG.coach.api_key.as_deref().ok_or(Error::NotConfigured)
    }
    /// charge one message against today's quota for the level
    #[instrument(skip(self), level = "debug")]
    pub fn check_quota(&self, user_id: i32, ai_level: u32) -> Result<()> {
        if ai_level == 0 {
            return Err(Error::Disabled);
        }
        let limit = CONFIG.coach.daily_limits[ai_level.min(4) as usize];
        let today = chrono::Utc::now().date_naive();

        if self.usage.len() > USAGE_SWEEP_THRESHOLD {
            self.usage.retain(|(_, day), _| *day == today);
        }

        let mut used = self.usage.entry((user_id, today)).or_insert(0);
        if *used >= limit {
            return Err(Error::QuotaExceeded);
        }
        *used += 1;
        Ok(())
    }
    fn wire_history<'a>(
        ai_level: u32,
        statement: &'a str,
        history: &'a [(Author, String)],
    ) -> Vec<WireMessage<'a>> {
        let tier = PROMPT_TIERS[(ai_level.clamp(1, 4) - 1) as usize];
        let mut messages = vec![
            WireMessage {
                role: "system",
                content: tier,
            },
            WireMessage {
                role: "system",
                content: statement,
            },
        ];
        messages.extend(history.iter().map(|(author, text)| WireMessage {
            role: match author {
                Author::Student => "user",
                Author::Coach => "assistant",
            },
            content: text.as_str(),
        }));
        messages
    }
    /// stream the coach reply, one content delta per item
    #[instrument(skip_all, level = "info", fields(ai_level = ai_level))]
    pub async fn reply(
        &self,
        ai_level: u32,
        statement: &str,
        history: &[(Author, String)],
    ) -> Result<ReceiverStream<Result<String>>> {
        let key = Self::api_key()?;
        let messages = Self::wire_history(ai_level, statement, history);

        let resp = self
            .client
            .post(format!("{}/chat/completions", CONFIG.coach.api_url))
            .bearer_auth(key)
            .json(&serde_json::json!({
                "model": CONFIG.coach.model,
                "messages": messages,
                "stream": true,
            }))
            .send()
            .await?
            .error_for_status()?;

        let (tx, rx) = mpsc::channel(REPLY_CHANNEL_SIZE);
        tokio::spawn(async move {
            let mut stream = resp.bytes_stream();
            let mut buffer = String::new();
            'outer: while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(x) => x,
                    Err(err) => {
                        tx.send(Err(err.into())).await.ok();
                        return;
                    }
                };
                buffer.push_str(String::from_utf8_lossy(&chunk).as_ref());
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_owned();
                    buffer.drain(..=pos);
                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data == "[DONE]" {
                        break 'outer;
                    }
                    match serde_json::from_str::<StreamChunk>(data) {
                        Ok(parsed) => {
                            if let Some(delta) = parsed
                                .choices
                                .into_iter()
                                .next()
                                .and_then(|x| x.delta.content)
                            {
                                if tx.send(Ok(delta)).await.is_err() {
                                    // client hung up
                                    return;
                                }
                            }
                        }
                        Err(_) => {
                            tx.send(Err(Error::MalformedReply)).await.ok();
                            return;
                        }
                    }
                }
            }
        });
        Ok(ReceiverStream::new(rx))
    }
    /// draft a problem for teacher curation, never auto-saved
    #[instrument(skip_all, level = "info")]
    pub async fn generate_problem(
        &self,
        category: &str,
        difficulty: u32,
        brief: &str,
    ) -> Result<(String, String)> {
        let key = Self::api_key()?;
        let prompt = format!(
            "Write one Python practice problem for high-school students.\n\
             Category: {}\nDifficulty: {} of 5\nTeacher notes: {}\n\
             Reply with a JSON object {{\"title\": ..., \"statement\": ...}}, \
             statement in markdown, nothing else.",
            category, difficulty, brief
        );
        let messages = [WireMessage {
            role: "user",
            content: &prompt,
        }];

        let resp: Completion = self
            .client
            .post(format!("{}/chat/completions", CONFIG.coach.api_url))
            .bearer_auth(key)
            .json(&serde_json::json!({
                "model": CONFIG.coach.model,
                "messages": messages,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = resp
            .choices
            .into_iter()
            .next()
            .ok_or(Error::MalformedReply)?
            .message
            .content;
        // tolerate a markdown code fence around the JSON
        let content = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```");
        let draft: GeneratedDraft =
            serde_json::from_str(content.trim()).map_err(|_| Error::MalformedReply)?;
        Ok((draft.title, draft.statement))
    }
}
