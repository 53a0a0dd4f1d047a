use bookdigest_common::{BookDigestError, Result, FAILURE_SENTINEL};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::llm_trait::ChatClient;
use crate::prompts::{word_limited_prompt, SYSTEM_PROMPT};
use crate::types::{ChatMessage, ChatRequest};

/// Sampling temperature for summary requests
pub const PROMPT_TEMPERATURE: f32 = 0.5;

/// Response token cap, independent of the requested word count
pub const PROMPT_MAX_TOKENS: u32 = 150;

/// Fixed pause between failed attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Summarizer that instructs a hosted chat model to stay within a word limit
///
/// Word bounds are passed to the model as an instruction only. The reply is
/// returned as-is (trimmed); nothing checks that it actually respects the
/// requested bounds.
pub struct PromptSummarizer {
    client: Arc<dyn ChatClient>,
    retry_delay: Duration,
}

impl PromptSummarizer {
    /// Create new prompt summarizer
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self {
            client,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Override the pause between attempts
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Summarize `text`, returning the failure sentinel once retries run out
    ///
    /// `max_retries` is the total number of attempts; 0 issues no request.
    pub async fn summarize(
        &self,
        text: &str,
        min_words: usize,
        max_words: usize,
        max_retries: u32,
    ) -> String {
        match self
            .try_summarize(text, min_words, max_words, max_retries)
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Prompt summarization gave up: {}", e);
                FAILURE_SENTINEL.to_string()
            }
        }
    }

    /// Summarize `text`, surfacing `RetryExhausted` instead of the sentinel
    pub async fn try_summarize(
        &self,
        text: &str,
        min_words: usize,
        max_words: usize,
        max_retries: u32,
    ) -> Result<String> {
        let request = ChatRequest {
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(word_limited_prompt(text, min_words, max_words)),
            ],
            temperature: PROMPT_TEMPERATURE,
            max_tokens: PROMPT_MAX_TOKENS,
        };

        debug!(
            "Requesting {}-{} word summary from {} - Text length: {} chars",
            min_words,
            max_words,
            self.client.model(),
            text.len()
        );

        let mut last_error = None;

        for attempt in 1..=max_retries {
            match self.client.chat(&request).await {
                Ok(reply) => return Ok(reply.trim().to_string()),
                Err(e) => {
                    warn!(
                        "Error during summarization (attempt {}/{}): {}",
                        attempt, max_retries, e
                    );
                    last_error = Some(e);
                    if attempt < max_retries {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(BookDigestError::RetryExhausted {
            attempts: max_retries,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt made".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted replies; errors once the script runs out
    struct ScriptedChat {
        replies: Mutex<VecDeque<Result<String>>>,
        calls: AtomicUsize,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedChat {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedChat {
        async fn chat(&self, request: &ChatRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(BookDigestError::request("script exhausted")))
        }

        async fn test_connection(&self) -> Result<bool> {
            Ok(true)
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn summarizer(chat: &Arc<ScriptedChat>) -> PromptSummarizer {
        PromptSummarizer::new(chat.clone()).with_retry_delay(Duration::ZERO)
    }

    fn fail() -> Result<String> {
        Err(BookDigestError::request("rate limited"))
    }

    #[tokio::test]
    async fn test_first_attempt_success_makes_one_call() {
        let chat = ScriptedChat::new(vec![Ok("  A tidy summary.  ".to_string())]);
        let summary = summarizer(&chat).summarize("text", 40, 50, 3).await;

        assert_eq!(summary, "A tidy summary.");
        assert_eq!(chat.calls(), 1);
    }

    #[tokio::test]
    async fn test_persistent_failure_returns_sentinel() {
        let chat = ScriptedChat::new(vec![]);
        let summary = summarizer(&chat).summarize("text", 40, 50, 3).await;

        assert_eq!(summary, "[SUMMARY FAILED]");
        assert_eq!(chat.calls(), 3);
    }

    #[tokio::test]
    async fn test_budget_counts_total_attempts() {
        // Two failures then a success: a budget of 2 never reaches the third reply.
        let chat = ScriptedChat::new(vec![fail(), fail(), Ok("late".to_string())]);
        let summary = summarizer(&chat).summarize("text", 40, 50, 2).await;
        assert_eq!(summary, FAILURE_SENTINEL);
        assert_eq!(chat.calls(), 2);

        let chat = ScriptedChat::new(vec![fail(), fail(), Ok("late".to_string())]);
        let summary = summarizer(&chat).summarize("text", 40, 50, 3).await;
        assert_eq!(summary, "late");
        assert_eq!(chat.calls(), 3);
    }

    #[tokio::test]
    async fn test_zero_budget_issues_no_request() {
        let chat = ScriptedChat::new(vec![Ok("unused".to_string())]);
        let err = summarizer(&chat)
            .try_summarize("text", 40, 50, 0)
            .await
            .unwrap_err();

        assert!(matches!(err, BookDigestError::RetryExhausted { attempts: 0, .. }));
        assert_eq!(chat.calls(), 0);
    }

    #[tokio::test]
    async fn test_request_parameters_are_fixed() {
        let chat = ScriptedChat::new(vec![Ok("ok".to_string())]);
        summarizer(&chat).summarize("The preface body.", 10, 400, 1).await;

        let seen = chat.seen.lock().unwrap();
        let request = &seen[0];
        assert_eq!(request.max_tokens, 150);
        assert!((request.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(request.messages[0].content, SYSTEM_PROMPT);
        assert!(request.messages[1].content.contains("The preface body."));
        assert!(request.messages[1].content.contains("EXACTLY 400 words"));
    }

    #[test]
    fn test_default_retry_delay() {
        let chat = ScriptedChat::new(vec![]);
        let summarizer = PromptSummarizer::new(chat);
        assert_eq!(summarizer.retry_delay, Duration::from_secs(2));
    }
}
