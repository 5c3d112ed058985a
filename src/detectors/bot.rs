use crate::pattern::PatternCache;
use crate::section::Section;

use super::Vocabularies;

/// Words that give a product name away as automated.
pub(super) const BOT_WORDS: &[&str] = &[
    "bot", "crawler", "spider", "spyder", "search", "worm", "fetch", "nutch",
];

const SITE: &str = r"https?://.+\.\w+";

/// A name recovered for a UA no rule or layout could place.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct Found {
    pub name: String,
    pub version: String,
    pub is_bot: bool,
}

pub(super) fn check(sections: &[Section<'_>], vocab: &Vocabularies, cache: &PatternCache) -> Option<Found> {
    match sections {
        [only] if only.name != "Mozilla" => {
            if only.name.is_empty() {
                return None;
            }
            let is_bot = vocab.bot_words.is_match(only.name) || site_name(&only.comments, cache).is_some();
            Some(Found {
                name: only.name.to_string(),
                version: only.version.to_string(),
                is_bot,
            })
        }
        _ => sections.iter().find_map(|s| {
            let site = site_name(&s.comments, cache)?;
            let (name, version) = site.split_once('/').unwrap_or((site, ""));
            Some(Found {
                name: name.to_string(),
                version: version.to_string(),
                is_bot: true,
            })
        }),
    }
}

/// Crawlers usually put a homepage link in their comment, with their own name
/// in the comment right before it. Where to look depends on the comment count.
fn site_name<'a>(comments: &[&'a str], cache: &PatternCache) -> Option<&'a str> {
    let index = match comments.len() {
        0 => return None,
        1 | 2 => 0,
        4 => 3,
        _ => 2,
    };
    let site = cache.get(SITE)?;
    let groups = site.captures(comments[index])?;
    if index == 0 {
        groups.first().copied().flatten()
    } else {
        Some(comments[index - 1].trim())
    }
}

/// Google's and Bing's crawlers mimic mobile browsers closely enough that the
/// OS cannot be trusted.
pub(super) fn is_google_or_bing(ua: &str) -> bool {
    ua.contains("Google") || ua.contains("bingbot")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::tokenize;

    fn found(ua: &str) -> Option<Found> {
        let vocab = Vocabularies::build().unwrap();
        check(&tokenize(ua), &vocab, &PatternCache::default())
    }

    #[test]
    fn named_after_site_comment() {
        let f = found("Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)").unwrap();
        assert_eq!(f.name, "Googlebot");
        assert_eq!(f.version, "2.1");
        assert!(f.is_bot);

        let f = found("Mozilla/5.0 (compatible; Yahoo! Slurp; http://help.yahoo.com/help/us/ysearch/slurp)").unwrap();
        assert_eq!(f.name, "Yahoo! Slurp");
        assert_eq!(f.version, "");
    }

    #[test]
    fn single_product() {
        let f = found("Twitterbot/1.0").unwrap();
        assert_eq!(f, Found { name: "Twitterbot".into(), version: "1.0".into(), is_bot: true });

        let f = found("Wget/1.21.1").unwrap();
        assert_eq!(f, Found { name: "Wget".into(), version: "1.21.1".into(), is_bot: false });

        let f = found("Pingdom.com_bot_version_1.4_(http://www.pingdom.com/)").unwrap();
        assert!(f.is_bot);

        let f = found("Acme/3.2 (+https://acme.example.org/agent)").unwrap();
        assert_eq!(f.name, "Acme");
        assert!(f.is_bot);
    }

    #[test]
    fn nothing_to_go_on() {
        assert!(found("Mozilla/5.0 (X11; Linux x86_64)").is_none());
        assert!(found("").is_none());
    }

    #[test]
    fn google_or_bing() {
        assert!(is_google_or_bing("Mozilla/5.0 (compatible; Google-InspectionTool/1.0)"));
        assert!(is_google_or_bing("Mozilla/5.0 (compatible; bingbot/2.0)"));
        assert!(!is_google_or_bing("Mozilla/5.0 (compatible; googlebot)"));
    }
}
