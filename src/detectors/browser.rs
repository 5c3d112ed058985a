use super::{bot, os, Context};
use crate::rules::{Category, Field};
use crate::section::Section;
use crate::types::Browser;

pub(super) fn detect(ctx: &mut Context<'_>) -> Browser {
    if is_imessage_preview(&ctx.sections, ctx.ua) {
        ctx.flags.engine_suppressed = true;
        return Browser {
            name: "iMessage-Preview".into(),
            ..Browser::default()
        };
    }

    let mut fields = ctx.match_rules(Category::Browser, ctx.ua);
    let mut browser = Browser {
        name: fields.take(Field::Name),
        version: fields.take(Field::Version),
        kind: fields.take(Field::Type),
        major: String::new(),
    };

    if browser.name.is_empty() || browser.version.is_empty() {
        let guess = guess(&ctx.sections);
        ctx.flags.undecided |= guess.undecided;
        if browser.name.is_empty() && !guess.name.is_empty() {
            browser.name = fixup(&ctx.sections, guess.name);
            browser.version = guess.version;
        }
    }

    if browser.name.is_empty() {
        if let Some(found) = bot::check(&ctx.sections, ctx.vocab, ctx.cache) {
            if found.is_bot {
                ctx.flags.bot = true;
                ctx.flags.engine_suppressed = true;
            }
            browser.name = found.name;
            browser.version = found.version;
        }
    }

    browser.major = major(&browser.version);
    browser
}

/// Name and version read off the section layout alone.
#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct Guess {
    pub name: String,
    pub version: String,
    /// Googlebot or bingbot is posing as a regular browser.
    pub undecided: bool,
}

impl Guess {
    fn named(name: &str, version: &str) -> Self {
        Guess {
            name: name.to_string(),
            version: version.to_string(),
            undecided: false,
        }
    }
}

pub(super) fn guess(sections: &[Section<'_>]) -> Guess {
    let Some(first) = sections.first() else {
        return Guess::default();
    };
    let slen = sections.len();

    match first.name {
        "Opera" => return Guess::named("Opera", first.version),
        // Dalvik carries no browser information.
        "Dalvik" => return Guess::default(),
        "okhttp" => return Guess::named("OkHttp", first.version),
        _ => {}
    }

    if slen == 1 {
        return msie(&first.comments).unwrap_or_default();
    }
    if slen == 2 {
        return Guess::default();
    }

    let engine = &sections[1];
    // Ubuntu builds leave the version after the engine empty, use the next one.
    let index = if sections[2].version.is_empty() && slen > 3 { 3 } else { 2 };
    let version = sections[index].version;

    match engine.name {
        "AppleWebKit" | "Blink" => {
            let undecided = engine
                .comments
                .iter()
                .any(|c| c.len() > 5 && (c.starts_with("Googlebot") || c.starts_with("bingbot")));
            let mut guess = webkit_browser(sections, index, undecided);
            guess.undecided = undecided;
            guess
        }
        "Gecko" => {
            if sections[2].name == "MRA" && slen > 4 {
                Guess::named(sections[4].name, sections[4].version)
            } else {
                Guess::named(sections[2].name, version)
            }
        }
        // Internet Explorer 11 drops MSIE and ends in "like Gecko".
        "like" if sections[2].name == "Gecko" => {
            let version = first
                .comments
                .iter()
                .find_map(|c| c.strip_prefix("rv:").filter(|v| !v.is_empty()))
                .unwrap_or("");
            Guess::named("Internet Explorer", version)
        }
        _ => Guess::default(),
    }
}

fn webkit_browser(sections: &[Section<'_>], index: usize, undecided: bool) -> Guess {
    let slen = sections.len();
    let last = &sections[slen - 1];
    match last.name {
        "Edge" | "EdgA" => return Guess::named("Edge", last.version),
        "Edg" if !undecided => return Guess::named("Edge", last.version),
        // Bots posing as Edge get no name from the layout.
        "Edg" => return Guess::default(),
        "OPR" => return Guess::named("Opera", last.version),
        "mobile" => return Guess::named("mobile App", ""),
        _ => {}
    }

    let third_last = &sections[slen - 3];
    match third_last.name {
        "YaBrowser" => return Guess::named("Yandex", third_last.version),
        "coc_coc_Browser" => return Guess::named("Coc Coc", third_last.version),
        _ => {}
    }

    let second_last = &sections[slen - 2];
    match second_last.name {
        "Electron" | "DuckDuckGo" | "PhantomJS" => Guess::named(second_last.name, second_last.version),
        _ => Guess::named(name_at(sections, index), sections[index].version),
    }
}

fn name_at(sections: &[Section<'_>], index: usize) -> &'static str {
    match sections[index].name {
        "Chrome" | "CriOS" => "Chrome",
        "HeadlessChrome" => "Headless Chrome",
        "Chromium" => "Chromium",
        "GSA" => "Google App",
        "FxiOS" => "Firefox",
        _ => "Safari",
    }
}

/// Legacy `(compatible; MSIE x; ...)` form. For IE 8 to 10 the Trident token
/// is more accurate than the MSIE one.
fn msie(comments: &[&str]) -> Option<Guess> {
    if comments.len() < 2 || comments[0] != "compatible" || !comments[1].starts_with("MSIE") {
        return None;
    }
    let trident = comments
        .iter()
        .find_map(|c| c.strip_prefix("Trident/"))
        .and_then(|v| match v {
            "4.0" => Some("8.0"),
            "5.0" => Some("9.0"),
            "6.0" => Some("10.0"),
            _ => None,
        });
    let version = trident.unwrap_or_else(|| comments[1]["MSIE".len()..].trim());
    Some(Guess::named("Internet Explorer", version))
}

/// Platforms whose browser is named after the platform itself.
fn fixup(sections: &[Section<'_>], guessed: String) -> String {
    let Some(first) = sections.first().filter(|s| s.name == "Mozilla") else {
        return guessed;
    };
    match os::platform(&first.comments) {
        p @ ("webOS" | "Symbian" | "BlackBerry") => p.to_string(),
        "Linux" if guessed == "Safari" => "Android".to_string(),
        _ => guessed,
    }
}

/// Apple's link preview impersonates both the Facebook and Twitter crawlers.
pub(super) fn is_imessage_preview(sections: &[Section<'_>], ua: &str) -> bool {
    let Some(first) = sections.first() else {
        return false;
    };
    first.name == "Mozilla"
        && first.comments.len() == 2
        && !matches!(os::platform(&first.comments), "webOS" | "Symbian" | "Linux")
        && !bot::is_google_or_bing(ua)
        && ua.contains("facebookexternalhit")
        && ua.contains("Twitterbot")
}

/// Digits before the first dot of `version`, ignoring any other characters.
pub(crate) fn major(version: &str) -> String {
    let digits: String = version
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.split('.').next().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::tokenize;

    fn guessed(ua: &str) -> Guess {
        guess(&tokenize(ua))
    }

    #[test]
    fn chrome_family_by_section() {
        let g = guessed("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36");
        assert_eq!(g, Guess::named("Chrome", "120.0.0.0"));

        let g = guessed("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) HeadlessChrome/119.0.6045.105 Safari/537.36");
        assert_eq!(g.name, "Headless Chrome");

        let g = guessed("Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/120.0.6099.119 Mobile/15E148 Safari/604.1");
        assert_eq!(g, Guess::named("Chrome", "120.0.6099.119"));
    }

    #[test]
    fn trailing_sections_take_precedence() {
        let g = guessed("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91");
        assert_eq!(g, Guess::named("Edge", "120.0.2210.91"));

        let g = guessed("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 OPR/106.0.0.0");
        assert_eq!(g, Guess::named("Opera", "106.0.0.0"));

        let g = guessed("Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 YaBrowser/23.11.0.0 Mobile Safari/537.36");
        assert_eq!(g, Guess::named("Yandex", "23.11.0.0"));

        let g = guessed("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Electron/28.1.0 Safari/537.36");
        assert_eq!(g, Guess::named("Electron", "28.1.0"));
    }

    #[test]
    fn bing_posing_as_edge_is_undecided() {
        let g = guessed("Mozilla/5.0 AppleWebKit/537.36 (KHTML, like Gecko; compatible; bingbot/2.0; +http://www.bing.com/bingbot.htm) Chrome/116.0.1938.76 Safari/537.36 Edg/116.0");
        assert!(g.undecided);
        assert_eq!(g.name, "");
    }

    #[test]
    fn gecko_and_mra() {
        let g = guessed("Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0");
        assert_eq!(g, Guess::named("Firefox", "120.0"));

        let g = guessed("Mozilla/5.0 (Windows; U; Windows NT 5.1; ru; rv:1.9.2.3) Gecko/20100401 MRA 5.6 (build 03278) Firefox/3.6.3");
        assert_eq!(g.name, "Firefox");
        assert_eq!(g.version, "3.6.3");
    }

    #[test]
    fn internet_explorer() {
        let g = guessed("Mozilla/5.0 (Windows NT 6.1; WOW64; Trident/7.0; rv:11.0) like Gecko");
        assert_eq!(g, Guess::named("Internet Explorer", "11.0"));

        let g = guessed("Mozilla/4.0 (compatible; MSIE 7.0; Windows NT 6.0; Trident/4.0)");
        assert_eq!(g, Guess::named("Internet Explorer", "8.0"));

        let g = guessed("Mozilla/4.0 (compatible; MSIE 6.0; Windows NT 5.1)");
        assert_eq!(g, Guess::named("Internet Explorer", "6.0"));
    }

    #[test]
    fn short_forms() {
        assert_eq!(guessed("Opera/9.80"), Guess::named("Opera", "9.80"));
        assert_eq!(guessed("okhttp/4.9.0"), Guess::named("OkHttp", "4.9.0"));
        assert_eq!(guessed("Dalvik/2.1.0 (Linux; U; Android 9)"), Guess::default());
        assert_eq!(guessed("Mozilla/5.0 Foo/1.0"), Guess::default());
        assert_eq!(guessed(""), Guess::default());
    }

    #[test]
    fn platform_fixups() {
        let sections = tokenize("Mozilla/5.0 (Linux; U; Android 2.3) AppleWebKit/533.1 (KHTML, like Gecko) Version/4.0 Mobile Safari/533.1");
        assert_eq!(fixup(&sections, "Safari".into()), "Android");

        let sections = tokenize("Mozilla/5.0 (webOS/1.4.0; U; en-US) AppleWebKit/532.2 (KHTML, like Gecko) Version/1.0 Safari/532.2 Pre/1.0");
        assert_eq!(fixup(&sections, "Safari".into()), "webOS");

        let sections = tokenize("Mozilla/5.0 (Macintosh) AppleWebKit/605.1.15 (KHTML, like Gecko) Safari/605.1.15");
        assert_eq!(fixup(&sections, "Safari".into()), "Safari");
    }

    #[test]
    fn imessage_preview() {
        let ua = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_1) AppleWebKit/601.2.4 (KHTML, like Gecko) Version/9.0.1 Safari/601.2.4 facebookexternalhit/1.1 Facebot Twitterbot/1.0";
        assert!(is_imessage_preview(&tokenize(ua), ua));

        let ua = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_1) AppleWebKit/601.2.4 (KHTML, like Gecko) Version/9.0.1 Safari/601.2.4";
        assert!(!is_imessage_preview(&tokenize(ua), ua));
    }

    #[test]
    fn major_versions() {
        assert_eq!(major("120.0.6099.119"), "120");
        assert_eq!(major("v2.3"), "2");
        assert_eq!(major("8.1.1b4948"), "8");
        assert_eq!(major(""), "");
    }
}
