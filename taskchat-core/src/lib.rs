//! # taskchat core
//!
//! The pieces behind the `taskchat` binary.
//!
//! ## Core Concepts
//! - **Provider**: trait-based chat completion client (OpenAI-compatible)
//! - **Exchange**: one prompt in, one reply out
//! - **Task**: a shell-style command line, parsed into a program + args
//! - **Runner**: executes tasks strictly one after another
//! - **Pool**: optional bounded concurrency that keeps submission order
//! - **Dataset**: NBA dataset catalog, Kaggle download, data dir listing

pub mod config;
pub mod dataset;
pub mod error;
pub mod exchange;
pub mod pool;
pub mod provider;
pub mod runner;
pub mod task;

pub use config::Settings;
pub use dataset::{catalog, csv_files, list_data_files, resolve, DataFile, DatasetEntry, KaggleClient, KaggleCredentials};
pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use exchange::{ask, ChatExchange};
pub use pool::run_parallel;
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
    OpenAIProvider, ProviderConfig, ProviderError, Role, Usage,
};
pub use runner::{run_tasks, ProcessLauncher, ProcessOutput, SystemLauncher, TaskResult, TaskRunner};
pub use task::{split_words, CommandSpec, ParseError, Task};
