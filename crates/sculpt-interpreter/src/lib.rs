//! Sculpt Interpreter - natural language to action candidates
//!
//! - `PromptBuilder` assembles the instruction and scene snapshot
//! - `LanguageModel` abstracts the chat service; `OpenAiChatModel` is the
//!   HTTP implementation
//! - `CommandInterpreter` calls the model and normalizes its output
//!
//! # Example
//!
//! ```rust
//! use sculpt_interpreter::parse_response;
//!
//! let candidates = parse_response(r#"{"action":"add","type":"tree"}"#).unwrap();
//! assert_eq!(candidates[0]["action"], "search");
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod interpreter;
pub mod model;
pub mod prompt;

pub use error::InterpreterError;
pub use interpreter::{parse_response, strip_code_fence, CommandInterpreter};
pub use model::{ChatRequest, InterpreterConfig, LanguageModel, OpenAiChatModel, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use prompt::{PromptBuilder, EXAMPLES};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
