use std::path::PathBuf;
use std::sync::Arc;

use crate::client_hints::{ClientHints, Headers, USER_AGENT};
use crate::detectors::{Context, Vocabularies};
use crate::error::Result;
use crate::extension::Extension;
use crate::pattern::{PatternCache, DEFAULT_BACKTRACK_LIMIT};
use crate::rules::RuleSet;
use crate::types::{Browser, Cpu, Device, Engine, Os, UserAgent};

/// Shortest UA parsed without Client-Hints.
pub const DEFAULT_MIN_LENGTH: usize = 5;
/// A UA at or above this length is dropped as hostile input.
pub const DEFAULT_MAX_LENGTH: usize = 500;

#[derive(Debug, Clone, Copy)]
struct Limits {
    min_length: usize,
    max_length: usize,
}

/// Classifies User-Agent strings and Client-Hints headers.
///
/// Cloning is cheap: clones share the rule tables and the compiled pattern
/// cache, so a pattern is compiled at most once however many threads parse.
#[derive(Debug, Clone)]
pub struct UserAgentParser {
    rules: Arc<RuleSet>,
    cache: Arc<PatternCache>,
    vocab: Arc<Vocabularies>,
    limits: Limits,
}

impl UserAgentParser {
    /// A parser over the built-in rule tables with default limits.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> UserAgentParserBuilder {
        UserAgentParserBuilder::default()
    }

    /// Start a request for `ua`. Nothing is detected until an accessor asks.
    pub fn request<'p>(&'p self, ua: &str) -> Request<'p> {
        Request {
            parser: self,
            ua: ua.to_string(),
            headers: None,
        }
    }

    pub fn parse(&self, ua: &str) -> UserAgent {
        self.request(ua).result()
    }

    pub fn parse_with_headers(&self, ua: &str, headers: &Headers) -> UserAgent {
        self.request(ua).with_headers(headers.clone()).result()
    }

    /// Compile every rule pattern now instead of on first use.
    pub fn precompile(&self) {
        self.cache.warm(self.rules.patterns());
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Number of patterns compiled so far, including ones rejected by both engines.
    pub fn compiled_patterns(&self) -> usize {
        self.cache.len()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum RuleSource {
    Builtin,
    Dir(PathBuf),
    Set(RuleSet),
}

#[derive(Debug, Clone)]
pub struct UserAgentParserBuilder {
    source: RuleSource,
    extensions: Vec<Extension>,
    min_length: usize,
    max_length: usize,
    backtrack_limit: usize,
}

impl Default for UserAgentParserBuilder {
    fn default() -> Self {
        UserAgentParserBuilder {
            source: RuleSource::Builtin,
            extensions: Vec::new(),
            min_length: DEFAULT_MIN_LENGTH,
            max_length: DEFAULT_MAX_LENGTH,
            backtrack_limit: DEFAULT_BACKTRACK_LIMIT,
        }
    }
}

impl UserAgentParserBuilder {
    /// Add an extension. Its rules run before the base tables, after any
    /// extension added earlier.
    pub fn extension(mut self, extension: Extension) -> Self {
        self.extensions.push(extension);
        self
    }

    pub fn extensions(mut self, extensions: impl IntoIterator<Item = Extension>) -> Self {
        self.extensions.extend(extensions);
        self
    }

    /// Replace the built-in tables.
    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.source = RuleSource::Set(rules);
        self
    }

    /// Load the base tables from a directory at build time.
    pub fn rules_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source = RuleSource::Dir(dir.into());
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = n;
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = n;
        self
    }

    /// Step budget for patterns that need the backtracking engine.
    pub fn backtrack_limit(mut self, n: usize) -> Self {
        self.backtrack_limit = n;
        self
    }

    pub fn build(self) -> Result<UserAgentParser> {
        let base = match self.source {
            RuleSource::Builtin => RuleSet::builtin()?,
            RuleSource::Dir(dir) => RuleSet::from_dir(dir)?,
            RuleSource::Set(rules) => rules,
        };
        let rules = base.with_extensions(&self.extensions);
        tracing::debug!(
            rules = rules.len(),
            extensions = self.extensions.len(),
            "parser built"
        );

        Ok(UserAgentParser {
            rules: Arc::new(rules),
            cache: Arc::new(PatternCache::new(self.backtrack_limit)),
            vocab: Arc::new(Vocabularies::build()?),
            limits: Limits {
                min_length: self.min_length,
                max_length: self.max_length,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// One UA, optionally with request headers. Each accessor runs only the stages
/// its category depends on.
#[derive(Debug, Clone)]
pub struct Request<'p> {
    parser: &'p UserAgentParser,
    ua: String,
    headers: Option<Headers>,
}

/// What survives the length gates.
enum Input {
    Empty,
    Detect { ua: String, hints: Option<ClientHints> },
}

impl<'p> Request<'p> {
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn browser(&self) -> Browser {
        self.detect(|ctx| ctx.browser().clone())
    }

    pub fn engine(&self) -> Engine {
        self.detect(|ctx| ctx.engine().clone())
    }

    pub fn os(&self) -> Os {
        self.detect(|ctx| ctx.os().clone())
    }

    pub fn device(&self) -> Device {
        self.detect(|ctx| ctx.device().clone())
    }

    pub fn cpu(&self) -> Cpu {
        self.detect(|ctx| ctx.cpu().clone())
    }

    pub fn result(&self) -> UserAgent {
        match self.input() {
            Input::Empty => UserAgent::default(),
            Input::Detect { ua, hints } => self.context(&ua, hints.as_ref()).into_user_agent(),
        }
    }

    fn detect<T: Default>(&self, f: impl FnOnce(&mut Context<'_>) -> T) -> T {
        match self.input() {
            Input::Empty => T::default(),
            Input::Detect { ua, hints } => f(&mut self.context(&ua, hints.as_ref())),
        }
    }

    fn context<'a>(&'a self, ua: &'a str, hints: Option<&'a ClientHints>) -> Context<'a> {
        let parser = self.parser;
        Context::new(ua, &parser.rules, &parser.cache, &parser.vocab, hints)
    }

    fn input(&self) -> Input {
        let Limits {
            min_length,
            max_length,
        } = self.parser.limits;

        let mut ua = self.ua.as_str();
        if ua.is_empty() {
            if let Some(fallback) = self.headers.as_ref().and_then(|h| h.get(USER_AGENT)) {
                if fallback.len() < max_length {
                    ua = fallback;
                }
            }
        }
        if ua.len() >= max_length {
            tracing::warn!(length = ua.len(), limit = max_length, "user agent too long, ignoring it");
            ua = "";
        }

        let hints = self
            .headers
            .as_ref()
            .filter(|h| h.has_client_hints())
            .map(ClientHints::from_headers);

        if hints.is_none() && ua.len() < min_length {
            return Input::Empty;
        }
        Input::Detect {
            ua: ua.to_string(),
            hints,
        }
    }
}
