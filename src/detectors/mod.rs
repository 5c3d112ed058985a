//! Per-category detection stages.
//!
//! Every stage runs its rule table first and then fills whatever is still
//! empty from the section layout. A [`Context`] carries the sections, the
//! categories computed so far and the flags earlier stages leave for later
//! ones. Categories are computed on first access, together with the ones they
//! depend on, and Client-Hints are folded in as soon as a category is done.

mod bot;
mod browser;
mod cpu;
mod device;
mod engine;
mod os;

use crate::client_hints::{self, ClientHints};
use crate::error::Result;
use crate::matcher::{self, Fields};
use crate::pattern::PatternCache;
use crate::rules::{Category, RuleSet};
use crate::section::{tokenize, Section};
use crate::types::{Browser, Cpu, Device, Engine, Os, UserAgent};
use crate::vocabulary::Vocabulary;

pub(crate) use browser::major;

/// Substring vocabularies used by the procedural fallbacks, built once per parser.
#[derive(Debug, Clone)]
pub(crate) struct Vocabularies {
    engines: Vocabulary<&'static str>,
    architectures: Vocabulary<Option<&'static str>>,
    bot_words: Vocabulary<()>,
}

impl Vocabularies {
    pub fn build() -> Result<Self> {
        Ok(Vocabularies {
            engines: Vocabulary::build(engine::LEGACY_ENGINES)?,
            architectures: Vocabulary::build(cpu::ARCHITECTURES)?,
            bot_words: Vocabulary::build(&[((), bot::BOT_WORDS)])?,
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Flags {
    /// Google or Bing is posing as a browser; the OS cannot be trusted.
    undecided: bool,
    bot: bool,
    engine_suppressed: bool,
    /// The device type was not detected and fell back to desktop.
    device_defaulted: bool,
}

/// What the first section's comments say about the platform.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Reading {
    pub platform: String,
    pub name: String,
    pub version: String,
    pub mobile: bool,
}

pub(crate) struct Context<'a> {
    ua: &'a str,
    sections: Vec<Section<'a>>,
    rules: &'a RuleSet,
    cache: &'a PatternCache,
    vocab: &'a Vocabularies,
    hints: Option<&'a ClientHints>,
    flags: Flags,
    reading: Option<Reading>,
    browser: Option<Browser>,
    engine: Option<Engine>,
    device: Option<Device>,
    os: Option<Os>,
    cpu: Option<Cpu>,
}

impl<'a> Context<'a> {
    pub fn new(
        ua: &'a str,
        rules: &'a RuleSet,
        cache: &'a PatternCache,
        vocab: &'a Vocabularies,
        hints: Option<&'a ClientHints>,
    ) -> Self {
        Context {
            ua,
            sections: tokenize(ua),
            rules,
            cache,
            vocab,
            hints,
            flags: Flags::default(),
            reading: None,
            browser: None,
            engine: None,
            device: None,
            os: None,
            cpu: None,
        }
    }

    fn match_rules(&self, category: Category, subject: &str) -> Fields {
        matcher::apply(self.rules.rules(category), subject, self.cache)
    }

    pub fn browser(&mut self) -> &Browser {
        if self.browser.is_none() {
            let mut browser = if self.ua.is_empty() {
                Browser::default()
            } else {
                browser::detect(self)
            };
            if let Some(hints) = self.hints {
                client_hints::reconcile_browser(&mut browser, hints, self.cache);
            }
            self.browser = Some(browser);
        }
        self.browser.get_or_insert_with(Browser::default)
    }

    pub fn engine(&mut self) -> &Engine {
        if self.engine.is_none() {
            self.browser();
            let mut engine = if self.ua.is_empty() || self.flags.engine_suppressed {
                Engine::default()
            } else {
                engine::detect(self)
            };
            if let Some(hints) = self.hints {
                client_hints::reconcile_engine(&mut engine, hints);
            }
            self.engine = Some(engine);
        }
        self.engine.get_or_insert_with(Engine::default)
    }

    pub fn device(&mut self) -> &Device {
        if self.device.is_none() {
            self.engine();
            let mut device = if self.ua.is_empty() {
                Device::default()
            } else {
                device::detect(self)
            };
            if let Some(hints) = self.hints {
                let rules = self.rules.rules(Category::Device);
                client_hints::reconcile_device(&mut device, self.flags.device_defaulted, hints, rules, self.cache);
            }
            self.device = Some(device);
        }
        self.device.get_or_insert_with(Device::default)
    }

    pub fn os(&mut self) -> &Os {
        if self.os.is_none() {
            self.engine();
            let mut os = if self.ua.is_empty() {
                Os::default()
            } else {
                os::detect(self)
            };
            if let Some(hints) = self.hints {
                client_hints::reconcile_os(&mut os, hints);
            }
            self.os = Some(os);
        }
        self.os.get_or_insert_with(Os::default)
    }

    pub fn cpu(&mut self) -> &Cpu {
        if self.cpu.is_none() {
            let mut cpu = if self.ua.is_empty() {
                Cpu::default()
            } else {
                cpu::detect(self)
            };
            if let Some(hints) = self.hints {
                let rules = self.rules.rules(Category::Cpu);
                client_hints::reconcile_cpu(&mut cpu, hints, rules, self.cache);
            }
            self.cpu = Some(cpu);
        }
        self.cpu.get_or_insert_with(Cpu::default)
    }

    /// The platform reading is shared by the device and OS stages.
    fn reading(&mut self) -> &Reading {
        if self.reading.is_none() {
            let browser = self.browser().name.clone();
            let engine = self.engine().name.clone();
            let (reading, undecided) = os::read(&self.sections, self.ua, &engine, &browser, self.flags.undecided);
            self.flags.undecided = undecided;
            self.reading = Some(reading);
        }
        self.reading.get_or_insert_with(Reading::default)
    }

    /// Run every stage in pipeline order.
    pub fn into_user_agent(mut self) -> UserAgent {
        self.browser();
        self.engine();
        self.device();
        self.os();
        self.cpu();
        UserAgent {
            ua: self.ua.to_string(),
            browser: self.browser.unwrap_or_default(),
            engine: self.engine.unwrap_or_default(),
            os: self.os.unwrap_or_default(),
            device: self.device.unwrap_or_default(),
            cpu: self.cpu.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_context<T>(ua: &str, f: impl FnOnce(&mut Context<'_>) -> T) -> T {
        let rules = RuleSet::builtin().unwrap();
        let cache = PatternCache::default();
        let vocab = Vocabularies::build().unwrap();
        let mut ctx = Context::new(ua, &rules, &cache, &vocab, None);
        f(&mut ctx)
    }

    #[test]
    fn categories_are_computed_on_demand() {
        with_context("Mozilla/5.0 (X11; Linux x86_64; rv:78.0) Gecko/20100101 Firefox/78.0", |ctx| {
            assert_eq!(ctx.cpu().architecture, "amd64");
            assert!(ctx.browser.is_none());
            assert!(ctx.reading.is_none());

            assert_eq!(ctx.engine().name, "Gecko");
            assert!(ctx.browser.is_some());
            assert!(ctx.device.is_none());
            assert!(ctx.os.is_none());
        });
    }

    #[test]
    fn bot_suppresses_engine_and_types_device() {
        with_context("Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)", |ctx| {
            assert_eq!(ctx.browser().name, "Googlebot");
            assert!(ctx.flags.bot);
            assert!(ctx.engine().is_empty());
            assert_eq!(ctx.device().kind, "bot");
        });
    }

    #[test]
    fn empty_ua_detects_nothing() {
        with_context("", |ctx| {
            assert!(ctx.browser().is_empty());
            assert!(ctx.device().is_empty());
            assert!(ctx.os().is_empty());
        });
    }
}
