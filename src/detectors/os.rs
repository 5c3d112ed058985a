use super::{bot, Context, Reading};
use crate::rules::{Category, Field};
use crate::section::Section;
use crate::types::Os;

pub(super) fn detect(ctx: &mut Context<'_>) -> Os {
    let mut fields = ctx.match_rules(Category::Os, ctx.ua);
    let mut os = Os {
        platform: String::new(),
        name: fields.take(Field::Name),
        version: fields.take(Field::Version),
    };

    let reading = ctx.reading().clone();
    os.platform = reading.platform;
    if os.name.is_empty() {
        os.name = reading.name;
        if os.version.is_empty() {
            os.version = reading.version;
        }
    }
    os
}

/// Platform named by the first comment of a `Mozilla` section.
pub(super) fn platform<'a>(comments: &[&'a str]) -> &'a str {
    match comments.first().copied() {
        None | Some("compatible") => "",
        Some(c) if c.starts_with("Windows") => "Windows",
        Some(c) if c.starts_with("Symbian") => "Symbian",
        Some(c) if c.starts_with("webOS") => "webOS",
        Some("BB10") => "BlackBerry",
        Some(c) => c,
    }
}

/// Interpret the first section's comments, given what the browser and engine
/// stages found. Returns the reading and the updated `undecided` flag.
pub(super) fn read(
    sections: &[Section<'_>],
    ua: &str,
    engine: &str,
    browser: &str,
    undecided: bool,
) -> (Reading, bool) {
    let mut it = Interpreter {
        ua,
        platform: String::new(),
        name: String::new(),
        mobile: false,
        undecided,
    };

    if let Some(first) = sections.first() {
        let comments = first.comments.as_slice();
        match first.name {
            "Mozilla" => {
                it.platform = platform(comments).to_string();
                if it.platform == "Windows" {
                    if let Some(c) = comments.first() {
                        it.name = normalize_windows(c).to_string();
                    }
                }
                match engine.to_ascii_lowercase().as_str() {
                    "" => it.undecided = true,
                    "gecko" | "webkit" | "applewebkit" | "blink" | "edgehtml" | "arkweb" => {
                        it.webkit_or_gecko(comments, engine, browser)
                    }
                    "trident" => it.trident(comments),
                    _ => {}
                }
            }
            "Opera" | "Dalvik" if comments.is_empty() => {}
            "Opera" => it.opera(comments),
            "Dalvik" => it.dalvik(comments),
            "okhttp" => it.mobile = true,
            _ => it.undecided = true,
        }
    }

    let (name, version) = split_name(&it.name);
    let reading = Reading {
        platform: it.platform,
        name,
        version,
        mobile: it.mobile,
    };
    (reading, it.undecided)
}

struct Interpreter<'a> {
    ua: &'a str,
    platform: String,
    name: String,
    mobile: bool,
    undecided: bool,
}

impl Interpreter<'_> {
    fn google_or_bing(&mut self) -> bool {
        if bot::is_google_or_bing(self.ua) {
            self.undecided = true;
        }
        self.undecided
    }

    fn webkit_or_gecko(&mut self, comments: &[&str], engine: &str, browser: &str) {
        match self.platform.as_str() {
            "webOS" => {
                self.name = "Palm".into();
                self.mobile = true;
            }
            "Symbian" => {
                self.mobile = true;
                self.name = comments.first().copied().unwrap_or_default().to_string();
            }
            "Linux" => {
                self.mobile = true;
                if comments.len() > 1 {
                    let name = match comments[1] {
                        "U" | "arm_64" => comments.get(2).copied().unwrap_or(comments[0]),
                        other => other,
                    };
                    self.name = name.to_string();
                }
                if comments.len() == 3 {
                    self.google_or_bing();
                }
            }
            _ if !comments.is_empty() => {
                if comments[0].starts_with("Windows NT") {
                    self.name = normalize_windows(comments[0]).to_string();
                } else if comments.len() == 2 {
                    if !self.google_or_bing() && browser != "iMessage-Preview" {
                        self.name = normalize_windows(comments[1]).to_string();
                    }
                } else if comments.len() > 2 {
                    self.name = normalize_windows(comments[2]).to_string();
                }
                if self.platform == "BlackBerry" && self.name == "Touch" {
                    self.name = self.platform.clone();
                }
            }
            _ => {}
        }

        // Firefox on iPad advertises itself as a Mac.
        let webkit = engine.eq_ignore_ascii_case("webkit") || engine.eq_ignore_ascii_case("applewebkit");
        if self.platform == "Macintosh" && webkit && browser == "Firefox" {
            self.platform = "iPad".into();
            self.mobile = true;
        }

        if self.name.contains("HarmonyOS") {
            self.name = "HarmonyOS".into();
            self.mobile = true;
        }
    }

    fn trident(&mut self, comments: &[&str]) {
        self.platform = "Windows".into();
        if self.name.is_empty() {
            self.name = match comments.get(2) {
                Some(c) => normalize_windows(c).to_string(),
                None => "Windows NT 4.0".into(),
            };
        }
        if comments.iter().any(|c| c.starts_with("IEMobile")) {
            self.mobile = true;
        }
    }

    fn opera(&mut self, comments: &[&str]) {
        let first = comments[0];
        if first.starts_with("Windows") {
            self.platform = "Windows".into();
            self.name = normalize_windows(first).to_string();
        } else {
            if first.starts_with("Android") {
                self.mobile = true;
            }
            self.platform = first.to_string();
            self.name = comments.get(1).copied().unwrap_or(first).to_string();
        }
    }

    fn dalvik(&mut self, comments: &[&str]) {
        if comments[0].starts_with("Linux") {
            self.platform = comments[0].to_string();
            if let Some(name) = comments.get(2) {
                self.name = name.to_string();
            }
            self.mobile = true;
        }
    }
}

/// Marketing name for a `Windows NT x.y` token; anything else passes through.
pub(super) fn normalize_windows(name: &str) -> &str {
    let mut parts = name.splitn(3, ' ');
    let (Some(_), Some("NT"), Some(version)) = (parts.next(), parts.next(), parts.next()) else {
        return name;
    };
    match version {
        "5.0" => "Windows 2000",
        "5.01" => "Windows 2000, Service Pack 1 (SP1)",
        "5.1" => "Windows XP",
        "5.2" => "Windows XP x64 Edition",
        "6.0" => "Windows Vista",
        "6.1" => "Windows 7",
        "6.2" => "Windows 8",
        "6.3" => "Windows 8.1",
        "10.0" => "Windows 10",
        _ => name,
    }
}

/// Split a raw OS string into name and version. The last word is the version,
/// except for architecture markers and the `X` of `Mac OS X`.
pub(super) fn split_name(raw: &str) -> (String, String) {
    let cleaned = remove_once(&remove_once(raw, "like Mac OS X"), "CPU");
    let cleaned = cleaned.trim_matches(' ');

    let mut words: Vec<&str> = cleaned.split(' ').collect();
    if cleaned == "Windows XP x64 Edition" {
        words.truncate(2);
    }

    let (mut name, mut version) = match words.split_last() {
        Some((last, rest)) if !rest.is_empty() => {
            let rest = match rest {
                ["Intel", "Mac", ..] => &rest[1..],
                _ => rest,
            };
            let name = rest.join(" ");
            if last.contains("x86") || last.contains("i686") {
                (name, String::new())
            } else if *last == "X" && name.eq_ignore_ascii_case("Mac OS") {
                (format!("{name} X"), String::new())
            } else {
                (name, last.to_string())
            }
        }
        _ => (cleaned.to_string(), String::new()),
    };

    if name.contains('/') {
        let mut parts = name.split('/');
        let (n, v) = (parts.next().unwrap_or_default(), parts.next().unwrap_or_default());
        let (n, v) = (n.to_string(), v.to_string());
        name = n;
        version = v;
    }

    (name, version.replace('_', "."))
}

/// Drop the first case-insensitive occurrence of `needle`.
fn remove_once(haystack: &str, needle: &str) -> String {
    match haystack.to_ascii_lowercase().find(&needle.to_ascii_lowercase()) {
        Some(at) => format!("{}{}", &haystack[..at], &haystack[at + needle.len()..]),
        None => haystack.to_string(),
    }
}
