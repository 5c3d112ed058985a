use std::sync::OnceLock;

use indexmap::IndexMap;

use crate::detectors::major;
use crate::mapper::Lookup;
use crate::matcher;
use crate::pattern::PatternCache;
use crate::rules::{Field, Rule};
use crate::types::{Browser, Cpu, Device, DeviceType, Engine, Os};

pub const SEC_CH_UA: &str = "sec-ch-ua";
pub const SEC_CH_UA_FULL_VERSION_LIST: &str = "sec-ch-ua-full-version-list";
pub const SEC_CH_UA_ARCH: &str = "sec-ch-ua-arch";
pub const SEC_CH_UA_BITNESS: &str = "sec-ch-ua-bitness";
pub const SEC_CH_UA_FORM_FACTORS: &str = "sec-ch-ua-form-factors";
pub const SEC_CH_UA_MOBILE: &str = "sec-ch-ua-mobile";
pub const SEC_CH_UA_MODEL: &str = "sec-ch-ua-model";
pub const SEC_CH_UA_PLATFORM: &str = "sec-ch-ua-platform";
pub const SEC_CH_UA_PLATFORM_VERSION: &str = "sec-ch-ua-platform-version";
pub const USER_AGENT: &str = "user-agent";

const NOT_A_BRAND: &str = r"(?i)not.a.brand";

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

/// Request headers keyed by lowercased name. A later spelling of the same
/// name replaces an earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    map: IndexMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.map.insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Whether any `sec-ch-ua*` header carries a value.
    pub fn has_client_hints(&self) -> bool {
        self.map
            .iter()
            .any(|(name, value)| name.starts_with(SEC_CH_UA) && !value.is_empty())
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        headers.extend(iter);
        headers
    }
}

impl<K: AsRef<str>, V: Into<String>> Extend<(K, V)> for Headers {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

// ---------------------------------------------------------------------------
// ClientHints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Brand {
    pub name: String,
    pub version: String,
}

/// Structured `Sec-CH-UA-*` hints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientHints {
    pub brands: Vec<Brand>,
    pub full_version_list: Vec<Brand>,
    pub architecture: String,
    pub bitness: String,
    pub form_factors: Vec<String>,
    pub mobile: bool,
    pub model: String,
    pub platform: String,
    pub platform_version: String,
}

impl ClientHints {
    pub fn from_headers(headers: &Headers) -> Self {
        let header = |name| headers.get(name).unwrap_or_default();
        let scalar = |name| header(name).replace('"', "");

        ClientHints {
            brands: brand_list(header(SEC_CH_UA)),
            full_version_list: brand_list(header(SEC_CH_UA_FULL_VERSION_LIST)),
            architecture: scalar(SEC_CH_UA_ARCH),
            bitness: scalar(SEC_CH_UA_BITNESS),
            form_factors: list(header(SEC_CH_UA_FORM_FACTORS)).map(str::to_string).collect(),
            mobile: header(SEC_CH_UA_MOBILE).contains("?1"),
            model: scalar(SEC_CH_UA_MODEL),
            platform: scalar(SEC_CH_UA_PLATFORM),
            platform_version: scalar(SEC_CH_UA_PLATFORM_VERSION),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &ClientHints::default()
    }
}

/// Comma-separated structured list with quotes (escaped or not) removed.
fn list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(',')
        .map(|token| token.trim_matches(|c: char| c == ' ' || c == '"' || c == '\\'))
        .filter(|token| !token.is_empty())
}

fn brand_list(value: &str) -> Vec<Brand> {
    let unquoted = value.replace("\\\"", "").replace('"', "");
    unquoted
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| match token.split_once(";v=") {
            Some((name, version)) => Brand {
                name: name.trim().to_string(),
                version: version.trim().to_string(),
            },
            None => Brand {
                name: token.split(';').next().unwrap_or_default().trim().to_string(),
                version: String::new(),
            },
        })
        .collect()
}

fn brand_names() -> &'static Lookup {
    static BRANDS: OnceLock<Lookup> = OnceLock::new();
    BRANDS.get_or_init(|| {
        Lookup::from_pairs(
            &[
                ("Chrome", &["Google Chrome"]),
                ("Edge", &["Microsoft Edge"]),
                ("Chrome WebView", &["Android WebView"]),
                ("Chrome Headless", &["HeadlessChrome"]),
                ("Huawei Browser", &["HuaweiBrowser"]),
                ("MIUI Browser", &["Miui Browser"]),
                ("Opera Mobi", &["OperaMobile"]),
                ("Yandex", &["YaBrowser"]),
            ],
            None,
        )
    })
}

fn form_factors() -> &'static Lookup {
    static FORM_FACTORS: OnceLock<Lookup> = OnceLock::new();
    FORM_FACTORS.get_or_init(|| {
        Lookup::from_pairs(
            &[
                (DeviceType::Embedded.as_str(), &["Automotive"]),
                (DeviceType::Mobile.as_str(), &["Mobile"]),
                (DeviceType::Tablet.as_str(), &["Tablet", "EInk"]),
                (DeviceType::SmartTv.as_str(), &["TV"]),
                (DeviceType::Wearable.as_str(), &["Watch"]),
                (DeviceType::Xr.as_str(), &["VR", "XR"]),
                ("", &["Desktop", "Unknown"]),
            ],
            None,
        )
    })
}

/// Brands in preference order: the full version list when sent, else the
/// low-entropy brand list.
fn brands(hints: &ClientHints) -> impl Iterator<Item = (&str, &str)> {
    let list = if hints.full_version_list.is_empty() {
        &hints.brands
    } else {
        &hints.full_version_list
    };
    list.iter()
        .map(|b| (brand_names().get(&b.name), b.version.as_str()))
}

// ---------------------------------------------------------------------------
// Reconciliation, one function per category
// ---------------------------------------------------------------------------

pub(crate) fn reconcile_browser(browser: &mut Browser, hints: &ClientHints, cache: &PatternCache) {
    let grease = cache.get(NOT_A_BRAND);
    let mut chosen: Option<&str> = None;

    for (name, version) in brands(hints) {
        if grease.as_ref().is_some_and(|p| p.captures(name).is_some()) {
            continue;
        }
        // Any specific brand beats the generic Chromium entries.
        let take = match chosen {
            None => true,
            Some(prev) => prev.to_ascii_lowercase().contains("chrom") && name != "Chromium",
        };
        if !take {
            continue;
        }
        browser.name = name.to_string();
        if !version.is_empty() {
            browser.version = version.to_string();
            browser.major = major(version);
        }
        chosen = Some(name);
    }
}

pub(crate) fn reconcile_engine(engine: &mut Engine, hints: &ClientHints) {
    for (name, version) in brands(hints) {
        if name == "Chromium" && !version.is_empty() {
            engine.version = version.to_string();
        }
    }
}

pub(crate) fn reconcile_cpu(cpu: &mut Cpu, hints: &ClientHints, rules: &[Rule], cache: &PatternCache) {
    if hints.architecture.is_empty() {
        return;
    }
    let mut arch = hints.architecture.clone();
    if hints.bitness == "64" {
        arch.push_str("64");
    }
    arch.push(';');

    let mut fields = matcher::apply(rules, &arch, cache);
    let architecture = fields.take(Field::Architecture);
    if !architecture.is_empty() {
        cpu.architecture = architecture;
    }
}

/// `defaulted` marks a type that fell back to desktop for lack of evidence;
/// hints may replace it as if it were empty.
pub(crate) fn reconcile_device(
    device: &mut Device,
    defaulted: bool,
    hints: &ClientHints,
    rules: &[Rule],
    cache: &PatternCache,
) {
    if defaulted {
        device.kind.clear();
    }
    if hints.mobile {
        device.kind = DeviceType::Mobile.as_str().to_string();
    }

    if !hints.model.is_empty() {
        device.model = hints.model.clone();
        if device.kind.is_empty() || device.vendor.is_empty() {
            let mut fields = matcher::apply(rules, &format!("droid 9; {})", hints.model), cache);
            if device.kind.is_empty() {
                device.kind = fields.take(Field::Type);
            }
            if device.vendor.is_empty() {
                device.vendor = fields.take(Field::Vendor);
            }
        }
    }

    if let Some(kind) = hints
        .form_factors
        .iter()
        .filter_map(|ff| form_factors().find(ff))
        .find(|kind| !kind.is_empty())
    {
        device.kind = kind.to_string();
    }

    if hints.model == "Xbox" {
        device.kind = DeviceType::Console.as_str().to_string();
        device.vendor = "Microsoft".into();
    }

    if defaulted && device.kind.is_empty() {
        device.kind = DeviceType::Desktop.as_str().to_string();
    }
}

pub(crate) fn reconcile_os(os: &mut Os, hints: &ClientHints) {
    if !hints.platform.is_empty() {
        let version = if hints.platform == "Windows" {
            // Windows 11 reports platform version 13 and up.
            let major: u32 = major(&hints.platform_version).parse().unwrap_or(0);
            if major >= 13 { "11" } else { "10" }.to_string()
        } else {
            hints.platform_version.clone()
        };
        os.name = hints.platform.clone();
        os.version = version;
    }

    if os.name == "Windows" && hints.model == "Xbox" {
        os.name = "Xbox".into();
        os.version.clear();
    }
}
