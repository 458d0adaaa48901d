//! Language model client: prompt in, text out
//!
//! Defines the model trait the scorer calls. Two implementations:
//! - `CommandModel`: spawns a local model command per prompt (production),
//!   e.g. `ollama run gpt-oss`, writing the prompt to stdin and reading stdout
//! - `MockModel`: returns queued responses (testing)
//!
//! The scorer owns prompt construction and response parsing. This module only
//! moves text in and out of a model.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Errors from language model calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("language model not available: {0}")]
    Unavailable(String),
    #[error("model invocation failed: {0}")]
    InvocationFailed(String),
    #[error("model call timed out after {seconds:.1}s")]
    Timeout { seconds: f64 },
}

/// Client trait for text completion.
///
/// Abstracts over transport (local process, HTTP, mock) so the scorer
/// doesn't depend on how the model is reached.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Check if the model can be reached.
    async fn is_available(&self) -> bool;

    /// Send one prompt and return the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Model reached by spawning a command for each prompt.
///
/// The prompt is written to the child's stdin, which is then closed; the
/// completion is everything the child writes to stdout.
#[derive(Debug, Clone)]
pub struct CommandModel {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandModel {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// `ollama run <model>`
    pub fn ollama(model: &str) -> Self {
        Self::new("ollama").with_args(["run", model])
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Kill the child when it runs longer than `limit`.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn resolves(&self) -> bool {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return program.is_file();
        }
        std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
            .unwrap_or(false)
    }

    async fn run(&self, prompt: &str) -> Result<String, LlmError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LlmError::Unavailable(format!("failed to start {}: {}", self.program, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| LlmError::InvocationFailed("no stdin available".to_string()))?;
        stdin
            .write_all(prompt.as_bytes())
            .await
            .map_err(|e| LlmError::InvocationFailed(format!("failed to write prompt: {}", e)))?;
        // Closing stdin tells the model the prompt is complete
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| LlmError::InvocationFailed(format!("failed to read output: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LlmError::InvocationFailed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(program = %self.program, bytes = text.len(), "model completion received");
        Ok(text)
    }
}

#[async_trait]
impl LanguageModel for CommandModel {
    async fn is_available(&self) -> bool {
        self.resolves()
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        match self.timeout {
            Some(limit) => timeout(limit, self.run(prompt))
                .await
                .map_err(|_| LlmError::Timeout {
                    seconds: limit.as_secs_f64(),
                })?,
            None => self.run(prompt).await,
        }
    }
}

/// Mock model for testing: serves queued responses in order, then a
/// fallback response once the queue is empty.
pub struct MockModel {
    available: bool,
    queue: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockModel {
    /// Create a mock model that reports as available.
    pub fn available() -> Self {
        Self {
            available: true,
            queue: Mutex::new(VecDeque::new()),
            fallback: None,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock model that reports as unavailable.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::available()
        }
    }

    /// A model that answers every prompt with the same text.
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::available().with_fallback(response)
    }

    /// Queue a response.
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.push(Ok(response.into()));
        self
    }

    /// Queue a failure.
    pub fn with_failure(self, error: LlmError) -> Self {
        self.push(Err(error));
        self
    }

    /// Response served once the queue is exhausted.
    pub fn with_fallback(mut self, response: impl Into<String>) -> Self {
        self.fallback = Some(response.into());
        self
    }

    /// Sleep before answering each prompt.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `complete` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn push(&self, entry: Result<String, LlmError>) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(entry);
        }
    }

    fn next(&self) -> Option<Result<String, LlmError>> {
        self.queue.lock().ok().and_then(|mut q| q.pop_front())
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        if !self.available {
            return Err(LlmError::Unavailable(
                "mock model configured as unavailable".to_string(),
            ));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.next() {
            Some(entry) => entry,
            None => self.fallback.clone().ok_or_else(|| {
                LlmError::InvocationFailed("no mock response queued".to_string())
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_serves_queue_then_fallback() {
        let model = MockModel::available()
            .with_response("first")
            .with_failure(LlmError::InvocationFailed("boom".into()))
            .with_fallback("later");

        assert!(model.is_available().await);
        assert_eq!(model.complete("p1").await.unwrap(), "first");
        assert!(model.complete("p2").await.is_err());
        assert_eq!(model.complete("p3").await.unwrap(), "later");
        assert_eq!(model.calls(), 3);
        assert_eq!(model.prompts(), vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn mock_unavailable_returns_error() {
        let model = MockModel::unavailable();
        assert!(!model.is_available().await);
        let err = model.complete("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::Unavailable(_)));
    }

    #[tokio::test]
    async fn mock_without_responses_fails_invocation() {
        let model = MockModel::available();
        let err = model.complete("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::InvocationFailed(_)));
    }

    #[tokio::test]
    async fn missing_command_is_unavailable() {
        let model = CommandModel::new("ontoscope-no-such-model-binary");
        assert!(!model.is_available().await);
        let err = model.complete("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::Unavailable(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_model_echoes_through_cat() {
        let model = CommandModel::new("cat");
        let text = model.complete("Relevance: relevant").await.unwrap();
        assert_eq!(text, "Relevance: relevant");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_model_times_out() {
        let model = CommandModel::new("sleep")
            .with_args(["5"])
            .with_timeout(Duration::from_millis(50));
        let err = model.complete("").await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout { .. }));
    }

    #[test]
    fn ollama_builds_run_command() {
        let model = CommandModel::ollama("gpt-oss");
        assert_eq!(model.program(), "ollama");
        assert_eq!(model.args, vec!["run", "gpt-oss"]);
    }
}
