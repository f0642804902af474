use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

use super::error::JudgeError;
use super::parse::parse_verdicts;
use super::types::{ItemContext, JudgeVerdict, QueryContext};
use super::LlmJudge;

enum Reply {
    Verdicts(Vec<JudgeVerdict>),
    /// Raw text run through the production parser.
    Raw(String),
    Fail,
}

/// Scripted [`LlmJudge`]. Only verdicts for postings present in the request are returned.
pub struct MockJudge {
    reply: Mutex<Reply>,
    delay: Mutex<Option<Duration>>,
    requests: Mutex<Vec<Vec<String>>>,
}

impl MockJudge {
    pub fn with_verdicts(verdicts: Vec<JudgeVerdict>) -> Self {
        Self::from_reply(Reply::Verdicts(verdicts))
    }

    pub fn with_raw_reply(text: impl Into<String>) -> Self {
        Self::from_reply(Reply::Raw(text.into()))
    }

    pub fn failing() -> Self {
        Self::from_reply(Reply::Fail)
    }

    fn from_reply(reply: Reply) -> Self {
        Self {
            reply: Mutex::new(reply),
            delay: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Posting ids of every request received, in order.
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl LlmJudge for MockJudge {
    async fn score_batch(
        &self,
        _query: &QueryContext,
        items: &[ItemContext],
    ) -> Result<Vec<JudgeVerdict>, JudgeError> {
        self.requests
            .lock()
            .push(items.iter().map(|i| i.id.clone()).collect());

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let verdicts = match &*self.reply.lock() {
            Reply::Verdicts(verdicts) => verdicts.clone(),
            Reply::Raw(text) => parse_verdicts(text)?,
            Reply::Fail => {
                return Err(JudgeError::Provider {
                    model: "mock".to_string(),
                    message: "scripted failure".to_string(),
                });
            }
        };

        Ok(verdicts
            .into_iter()
            .filter(|v| items.iter().any(|i| i.id == v.item_id))
            .collect())
    }

    fn model_id(&self) -> &str {
        "mock-judge"
    }
}
