use std::path::Path;
use std::sync::OnceLock;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::parser::UserAgentParser;
use crate::rules::{compile_entries, Category, Rule, RuleEntry};
use crate::vocabulary::Vocabulary;

/// A named set of extra rules, keyed by category. Extension rules are tried
/// before the built-in ones.
///
/// ```yaml
/// browser:
///   - patterns: ['(?i)(wget|curl)[\/ ]([\w\.-]+)']
///     output: { name: '$1', version: '$2', type: cli }
/// ```
#[derive(Debug, Clone)]
pub struct Extension {
    name: String,
    rules: IndexMap<Category, Vec<Rule>>,
}

impl Extension {
    pub fn from_yaml_str(name: impl Into<String>, yaml: &str) -> Result<Self> {
        let entries: IndexMap<Category, Vec<RuleEntry>> = serde_yaml::from_str(yaml)?;
        let rules = entries
            .into_iter()
            .map(|(category, entries)| Ok((category, compile_entries(entries, category)?)))
            .collect::<Result<_>>()?;
        Ok(Extension {
            name: name.into(),
            rules,
        })
    }

    /// Load an extension file; the file stem becomes its name.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        std::fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|yaml| Self::from_yaml_str(name, &yaml))
            .map_err(|e| e.in_file(path))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self, category: Category) -> &[Rule] {
        self.rules.get(&category).map(Vec::as_slice).unwrap_or_default()
    }

    /// Concatenate extensions into one, keeping their order within each category.
    pub fn combine(name: impl Into<String>, parts: impl IntoIterator<Item = Extension>) -> Self {
        let mut rules: IndexMap<Category, Vec<Rule>> = IndexMap::new();
        for part in parts {
            for (category, list) in part.rules {
                rules.entry(category).or_default().extend(list);
            }
        }
        Extension {
            name: name.into(),
            rules,
        }
    }

    /// wget, curl, Lynx, ELinks, HTTPie.
    pub fn clis() -> Result<Self> {
        Self::from_yaml_str("clis", include_str!("../rules/extensions/clis.yml"))
    }

    pub fn crawlers() -> Result<Self> {
        Self::from_yaml_str("crawlers", include_str!("../rules/extensions/crawlers.yml"))
    }

    pub fn emails() -> Result<Self> {
        Self::from_yaml_str("emails", include_str!("../rules/extensions/emails.yml"))
    }

    pub fn fetchers() -> Result<Self> {
        Self::from_yaml_str("fetchers", include_str!("../rules/extensions/fetchers.yml"))
    }

    pub fn inapps() -> Result<Self> {
        Self::from_yaml_str("inapps", include_str!("../rules/extensions/inapps.yml"))
    }

    pub fn media_players() -> Result<Self> {
        Self::from_yaml_str("media_players", include_str!("../rules/extensions/media_players.yml"))
    }

    pub fn libraries() -> Result<Self> {
        Self::from_yaml_str("libraries", include_str!("../rules/extensions/libraries.yml"))
    }

    pub fn extra_devices() -> Result<Self> {
        Self::from_yaml_str("extra_devices", include_str!("../rules/extensions/extra_devices.yml"))
    }

    pub fn vehicles() -> Result<Self> {
        Self::from_yaml_str("vehicles", include_str!("../rules/extensions/vehicles.yml"))
    }

    /// Every automated client family: CLIs, crawlers, fetchers and libraries.
    pub fn bots() -> Result<Self> {
        Ok(Self::combine(
            "bots",
            [Self::clis()?, Self::crawlers()?, Self::fetchers()?, Self::libraries()?],
        ))
    }
}

// ---------------------------------------------------------------------------
// Bot helpers
// ---------------------------------------------------------------------------

const AI_CRAWLERS: &[&str] = &[
    "ai2bot",
    "amazonbot",
    "anthropic-ai",
    "claude-web",
    "claudebot",
    "applebot",
    "bytespider",
    "ccbot",
    "dataforseobot",
    "diffbot",
    "googleother",
    "google-extended",
    "imagesiftbot",
    "petalbot",
    "facebookbot",
    "meta-externalagent",
    "gptbot",
    "oai-searchbot",
    "perplexitybot",
    "semrushbot-ocob",
    "timpibot",
    "velenpublicwebcrawler",
    "omgili",
    "webzio-extended",
    "youbot",
    "scrapy",
];

/// Whether `ua` names a crawler known to collect AI training or answer data.
/// Tokens are matched ignoring ASCII case, so `GPTBot` and `gptbot` both count.
pub fn is_ai_bot(ua: &str) -> bool {
    static AI: OnceLock<Option<Vocabulary<()>>> = OnceLock::new();
    AI.get_or_init(|| Vocabulary::build(&[((), AI_CRAWLERS)]).ok())
        .as_ref()
        .is_some_and(|vocab| vocab.is_match(ua))
}

/// Whether `ua` is a CLI tool, crawler, fetcher or HTTP library, according to
/// the [`Extension::bots`] rules.
pub fn is_bot(ua: &str) -> bool {
    static BOTS: OnceLock<Option<UserAgentParser>> = OnceLock::new();
    let parser = BOTS.get_or_init(|| {
        Extension::bots()
            .and_then(|bots| UserAgentParser::builder().extension(bots).build())
            .map_err(|err| tracing::warn!(%err, "bot rules unavailable"))
            .ok()
    });
    parser.as_ref().is_some_and(|parser| {
        parser
            .request(ua)
            .browser()
            .browser_type()
            .is_some_and(|kind| kind.is_bot())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Browser;

    fn browser(ext: Extension, ua: &str) -> Browser {
        UserAgentParser::builder().extension(ext).build().unwrap().parse(ua).browser
    }

    fn expect(name: &str, version: &str, kind: &str) -> Browser {
        Browser {
            name: name.into(),
            version: version.into(),
            major: version.split('.').next().unwrap().into(),
            kind: kind.into(),
        }
    }

    #[test]
    fn builtin_extensions_load() {
        for ext in [
            Extension::clis(),
            Extension::crawlers(),
            Extension::emails(),
            Extension::fetchers(),
            Extension::inapps(),
            Extension::media_players(),
            Extension::libraries(),
            Extension::extra_devices(),
            Extension::vehicles(),
        ] {
            let ext = ext.unwrap();
            let total: usize = Category::ALL.iter().map(|c| ext.rules(*c).len()).sum();
            assert!(total > 0, "{} is empty", ext.name());
        }
        assert!(Extension::vehicles().unwrap().rules(Category::Browser).is_empty());
    }

    #[test]
    fn bots_concatenates_in_order() {
        let bots = Extension::bots().unwrap();
        let parts = [
            Extension::clis().unwrap(),
            Extension::crawlers().unwrap(),
            Extension::fetchers().unwrap(),
            Extension::libraries().unwrap(),
        ];
        let expected: usize = parts.iter().map(|p| p.rules(Category::Browser).len()).sum();
        assert_eq!(bots.rules(Category::Browser).len(), expected);
        let first: Vec<_> = bots.rules(Category::Browser)[0].patterns().collect();
        let cli: Vec<_> = parts[0].rules(Category::Browser)[0].patterns().collect();
        assert_eq!(first, cli);
    }

    #[test]
    fn crawlers_and_clis() {
        let both = Extension::combine("both", [Extension::crawlers().unwrap(), Extension::clis().unwrap()]);
        let parser = UserAgentParser::builder().extension(both).build().unwrap();
        assert_eq!(parser.parse("Wget/1.21.1").browser, expect("Wget", "1.21.1", "cli"));
        assert_eq!(
            parser
                .parse("Mozilla/5.0 (compatible; FacebookBot/1.0; +https://developers.facebook.com/docs/sharing/webmasters/facebookbot/)")
                .browser,
            expect("FacebookBot", "1.0", "crawler")
        );
    }

    #[test]
    fn emails() {
        let outlook = "Mozilla/4.0 (compatible; MSIE 7.0; Windows NT 10.0; WOW64; Trident/7.0; .NET4.0C; .NET4.0E; .NET CLR 2.0.50727; .NET CLR 3.0.30729; .NET CLR 3.5.30729; Microsoft Outlook 16.0.9126; Microsoft Outlook 16.0.9126; ms-office; MSOffice 16)";
        assert_eq!(browser(Extension::emails().unwrap(), outlook), expect("Microsoft Outlook", "16.0.9126", "email"));

        let thunderbird = "Mozilla/5.0 (X11; Linux x86_64; rv:78.0) Gecko/20100101 Thunderbird/78.13.0";
        assert_eq!(browser(Extension::emails().unwrap(), thunderbird), expect("Thunderbird", "78.13.0", "email"));
    }

    #[test]
    fn libraries() {
        let lib = || Extension::libraries().unwrap();
        assert_eq!(browser(lib(), "axios/1.3.5"), expect("axios", "1.3.5", "library"));
        assert_eq!(
            browser(lib(), "Mozilla/5.0 (darwin) AppleWebKit/537.36 (KHTML, like Gecko) jsdom/20.0.3"),
            expect("jsdom", "20.0.3", "library")
        );
        assert_eq!(browser(lib(), "Scrapy/1.5.0 (+https://scrapy.org)"), expect("Scrapy", "1.5.0", "library"));
    }

    #[test]
    fn bluesky_is_a_fetcher() {
        assert_eq!(
            browser(Extension::bots().unwrap(), "Mozilla/5.0 (compatible; Bluesky Cardyb/1.1; +mailto:support@bsky.app)"),
            expect("Bluesky", "1.1", "fetcher")
        );
    }

    #[test]
    fn custom_extension_from_yaml() {
        let yaml = "browser:\n  - patterns: ['(?i)(acmebot)/([\\w.]+)']\n    output:\n      name: AcmeBot\n      version: '$2'\n      type: crawler\n";
        let ext = Extension::from_yaml_str("acme", yaml).unwrap();
        assert_eq!(ext.name(), "acme");
        assert_eq!(browser(ext, "AcmeBot/2.4 (+https://acme.example)"), expect("AcmeBot", "2.4", "crawler"));

        assert!(Extension::from_yaml_str("bad", "planet:\n  - patterns: ['x']\n    output: {name: X}\n").is_err());
    }

    #[test]
    fn from_path_names_after_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("rules/extensions/vehicles.yml");
        let ext = Extension::from_path(path).unwrap();
        assert_eq!(ext.name(), "vehicles");

        let err = Extension::from_path("missing/ext.yml").unwrap_err();
        assert!(matches!(err, Error::Rules { .. }));
    }

    #[test]
    fn ai_bots() {
        assert!(is_ai_bot("Mozilla/5.0 (compatible; ai2bot/1.0; +http://www.ai2.com/bot.html)"));
        assert!(is_ai_bot("Mozilla/5.0 (compatible; gptbot/1.0; +http://www.openai.com/bot.html)"));
        assert!(is_ai_bot("Mozilla/5.0 AppleWebKit/537.36 (KHTML, like Gecko; compatible; ClaudeBot/1.0; +claudebot@anthropic.com)"));
        assert!(!is_ai_bot("Mozilla/5.0 (compatible; googlebot/2.1; +http://www.google.com/bot.html)"));
        assert!(!is_ai_bot("Mozilla/5.0 (compatible; someotherbot/1.0; +http://www.someotherbot.com/bot.html)"));
    }

    #[test]
    fn ai_bots_ignore_case() {
        for ua in ["GPTBot/1.2", "gptbot/1.2", "GPTBOT/1.2", "Mozilla/5.0 (compatible; CLAUDEBOT/1.0)"] {
            assert!(is_ai_bot(ua), "{ua}");
        }
    }

    #[test]
    fn bots() {
        assert!(is_bot("Mozilla/5.0 (compatible; googlebot/2.1; +http://www.google.com/bot.html)"));
        assert!(is_bot("Mozilla/5.0 (compatible; bingbot/2.0; +http://www.bing.com/bingbot.htm)"));
        assert!(is_bot("Mozilla/5.0 (compatible; YandexBot/3.0; +http://yandex.com/bots)"));
        assert!(is_bot("curl/8.4.0"));
        assert!(!is_bot(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3"
        ));
    }
}
