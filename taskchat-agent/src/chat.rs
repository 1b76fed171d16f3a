//! The interactive loop: read a line, ask the provider, print the reply.

use std::io::{BufRead, Write};
use taskchat_core::{ask, LlmProvider, Result};
use tracing::{debug, info};

/// Text surrounding the conversation
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Printed once before the first prompt
    pub banner: String,
    /// Printed before reading each line
    pub prompt_label: String,
    /// Prefix of every reply line
    pub reply_label: String,
    /// A line equal to this (ignoring ASCII case) ends the loop
    pub exit_word: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            banner: "Welcome to your AI app! Type 'exit' to quit.".to_string(),
            prompt_label: "You: ".to_string(),
            reply_label: "AI: ".to_string(),
            exit_word: "exit".to_string(),
        }
    }
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEnd {
    /// The user typed the exit word
    ExitRequested,
    /// Input ran out
    EndOfInput,
}

/// Outcome of a finished session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatSummary {
    pub end: LoopEnd,
    pub exchanges: usize,
}

/// The prompt/reply loop. Borrows the provider handle; it never builds one.
pub struct ChatLoop<'a, P> {
    provider: &'a P,
    config: ChatConfig,
}

impl<'a, P: LlmProvider> ChatLoop<'a, P> {
    /// Create a loop with the default labels
    pub fn new(provider: &'a P) -> Self {
        Self::with_config(provider, ChatConfig::default())
    }

    /// Create a loop with custom labels
    pub fn with_config(provider: &'a P, config: ChatConfig) -> Self {
        Self { provider, config }
    }

    fn is_exit(&self, line: &str) -> bool {
        line.eq_ignore_ascii_case(&self.config.exit_word)
    }

    /// Run until the exit word or end of input.
    ///
    /// Empty lines are skipped; whitespace-only lines are sent like any other
    /// prompt. The first provider failure ends the loop and is returned as is.
    pub async fn run<R: BufRead, W: Write>(&self, mut input: R, mut output: W) -> Result<ChatSummary> {
        writeln!(output, "{}", self.config.banner)?;

        let mut exchanges = 0;
        let mut line = String::new();
        loop {
            write!(output, "{}", self.config.prompt_label)?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                debug!(exchanges, "input closed");
                return Ok(ChatSummary {
                    end: LoopEnd::EndOfInput,
                    exchanges,
                });
            }

            let prompt = line.trim_end_matches(['\n', '\r']);
            if self.is_exit(prompt) {
                info!(exchanges, "exit requested");
                return Ok(ChatSummary {
                    end: LoopEnd::ExitRequested,
                    exchanges,
                });
            }
            if prompt.is_empty() {
                continue;
            }

            let exchange = ask(self.provider, prompt).await?;
            exchanges += 1;
            writeln!(output, "{}{}", self.config.reply_label, exchange.reply)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use taskchat_core::{
        CompletionRequest, CompletionResponse, ErrorKind, FinishReason, ProviderError, Usage,
    };

    struct MockProvider {
        prompts: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl MockProvider {
        fn new(constructed: &AtomicUsize) -> Self {
            constructed.fetch_add(1, Ordering::SeqCst);
            Self {
                prompts: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn default_model(&self) -> &str {
            "gpt-3.5-turbo"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, ProviderError> {
            let prompt = request.messages[0].content.clone();
            self.prompts.lock().unwrap().push(prompt.clone());
            if self.fail_on == Some(prompt.as_str()) {
                return Err(ProviderError::Network("connection reset".into()));
            }
            Ok(CompletionResponse {
                id: "mock".into(),
                model: "gpt-3.5-turbo".into(),
                content: Some(format!("echo: {}", prompt)),
                finish_reason: FinishReason::Stop,
                usage: Usage::default(),
            })
        }
    }

    async fn run_with(provider: &MockProvider, input: &str) -> (Result<ChatSummary>, String) {
        let mut out = Vec::new();
        let result = ChatLoop::new(provider).run(input.as_bytes(), &mut out).await;
        (result, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_exit_ends_without_exchange() {
        let constructed = AtomicUsize::new(0);
        let provider = MockProvider::new(&constructed);

        for word in ["exit\n", "EXIT\n", "Exit"] {
            let (result, out) = run_with(&provider, word).await;
            let summary = result.unwrap();
            assert_eq!(summary.end, LoopEnd::ExitRequested);
            assert_eq!(summary.exchanges, 0);
            assert_eq!(out, "Welcome to your AI app! Type 'exit' to quit.\nYou: ");
        }
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_replies_are_labelled() {
        let constructed = AtomicUsize::new(0);
        let provider = MockProvider::new(&constructed);

        let (result, out) = run_with(&provider, "hello\r\nhow are you?\nexit\n").await;
        assert_eq!(result.unwrap().exchanges, 2);
        assert_eq!(
            out,
            "Welcome to your AI app! Type 'exit' to quit.\n\
             You: AI: echo: hello\n\
             You: AI: echo: how are you?\n\
             You: "
        );
        assert_eq!(provider.prompts(), vec!["hello", "how are you?"]);
    }

    #[tokio::test]
    async fn test_client_handle_built_once() {
        let constructed = AtomicUsize::new(0);
        let provider = MockProvider::new(&constructed);

        let chat = ChatLoop::new(&provider);
        for _ in 0..2 {
            let mut out = Vec::new();
            chat.run("one\ntwo\nthree\n".as_bytes(), &mut out).await.unwrap();
        }

        assert_eq!(constructed.load(Ordering::SeqCst), 1);
        assert_eq!(provider.prompts().len(), 6);
    }

    #[tokio::test]
    async fn test_end_of_input_and_blank_lines() {
        let constructed = AtomicUsize::new(0);
        let provider = MockProvider::new(&constructed);

        let (result, _) = run_with(&provider, "\n\r\n   \nping").await;
        let summary = result.unwrap();
        assert_eq!(summary.end, LoopEnd::EndOfInput);
        assert_eq!(summary.exchanges, 2);
        assert_eq!(provider.prompts(), vec!["   ", "ping"]);
    }

    #[tokio::test]
    async fn test_exit_word_must_match_whole_line() {
        let constructed = AtomicUsize::new(0);
        let provider = MockProvider::new(&constructed);

        let (result, _) = run_with(&provider, "exit now\nexit\n").await;
        assert_eq!(result.unwrap().exchanges, 1);
        assert_eq!(provider.prompts(), vec!["exit now"]);
    }

    #[tokio::test]
    async fn test_provider_failure_stops_loop() {
        let constructed = AtomicUsize::new(0);
        let provider = MockProvider {
            fail_on: Some("boom"),
            ..MockProvider::new(&constructed)
        };

        let (result, out) = run_with(&provider, "fine\nboom\nnever\n").await;
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkFailed);
        assert_eq!(provider.prompts(), vec!["fine", "boom"]);
        assert!(out.ends_with("You: "));
    }
}
