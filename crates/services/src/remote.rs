use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use quiz_core::model::SessionResult;

use crate::error::SinkError;
use crate::sink::{ResultSink, ResultSubmission, SubmissionReceipt};

#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub base_url: String,
}

impl RemoteConfig {
    /// Reads `QUIZ_API_BASE_URL`, e.g. `https://example.org/api`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("QUIZ_API_BASE_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        Some(Self { base_url })
    }

    #[must_use]
    pub fn completion_url(&self) -> String {
        format!("{}/lessons/complete", self.base_url.trim_end_matches('/'))
    }
}

/// Posts finalized results to the learning API's lesson-completion endpoint.
///
/// One attempt per call; a failed post is reported, not retried.
#[derive(Clone)]
pub struct RemoteResultSink {
    client: Client,
    config: RemoteConfig,
}

impl RemoteResultSink {
    #[must_use]
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn from_env() -> Option<Self> {
        RemoteConfig::from_env().map(Self::new)
    }
}

#[async_trait]
impl ResultSink for RemoteResultSink {
    async fn submit(&self, submission: &ResultSubmission) -> Result<SubmissionReceipt, SinkError> {
        let token = submission
            .auth
            .bearer_token()
            .ok_or(SinkError::Unauthenticated)?;

        let payload = LessonCompletePayload::from_result(&submission.result);
        let response = self
            .client
            .post(self.config.completion_url())
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SinkError::HttpStatus(response.status()));
        }

        let body: LessonCompleteResponse = response.json().await?;
        receipt_from_response(body)
    }
}

fn receipt_from_response(body: LessonCompleteResponse) -> Result<SubmissionReceipt, SinkError> {
    if !body.success {
        return Err(SinkError::Rejected(body.message));
    }
    Ok(SubmissionReceipt::Accepted {
        message: body.message,
        words_learned: body.words_learned,
    })
}

#[derive(Debug, Serialize)]
struct LessonCompletePayload<'a> {
    lesson_id: &'a str,
    answers: Vec<QuizAnswerPayload<'a>>,
    total_time: u64,
}

#[derive(Debug, Serialize)]
struct QuizAnswerPayload<'a> {
    word_id: &'a str,
    is_correct: bool,
    time_spent: u32,
}

impl<'a> LessonCompletePayload<'a> {
    fn from_result(result: &'a SessionResult) -> Self {
        Self {
            lesson_id: result.lesson_id().as_str(),
            answers: result
                .responses()
                .iter()
                .map(|r| QuizAnswerPayload {
                    word_id: r.item_id.as_str(),
                    is_correct: r.is_correct,
                    time_spent: r.elapsed_seconds,
                })
                .collect(),
            total_time: result.total_elapsed_seconds(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LessonCompleteResponse {
    success: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    words_learned: Option<u32>,
}
