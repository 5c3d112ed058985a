//! Rule-driven User-Agent parsing.
//!
//! A UA string is split into product sections, matched against ordered YAML
//! rule tables per category, completed from the section layout where no rule
//! applies, and finally reconciled with any Client-Hints headers.
//!
//! ```no_run
//! use ua_parser::{Extension, UserAgentParser};
//!
//! let parser = UserAgentParser::builder()
//!     .extension(Extension::bots()?)
//!     .build()?;
//! let ua = parser.parse("Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0");
//! assert_eq!(ua.browser.name, "Firefox");
//! # Ok::<(), ua_parser::Error>(())
//! ```

mod client_hints;
mod detectors;
mod error;
mod extension;
mod mapper;
mod matcher;
mod parser;
mod pattern;
mod rules;
mod section;
mod template;
mod types;
mod vocabulary;

pub use client_hints::{Brand, ClientHints, Headers};
pub use error::{Error, Result};
pub use extension::{is_ai_bot, is_bot, Extension};
pub use parser::{Request, UserAgentParser, UserAgentParserBuilder, DEFAULT_MAX_LENGTH, DEFAULT_MIN_LENGTH};
pub use rules::{Category, Field, Rule, RuleSet};
pub use types::*;
