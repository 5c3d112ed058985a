use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::rules::Field;

// ---------------------------------------------------------------------------
// YAML form
// ---------------------------------------------------------------------------

/// `{ field: version, apply: underscore_to_dot }`, or for lookups
/// `{ field: type, apply: lookup, table: { tablet: [p10001l] }, default: mobile }`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MapperEntry {
    pub field: Field,
    pub apply: String,
    #[serde(default)]
    pub table: Option<IndexMap<String, Vec<String>>>,
    #[serde(default)]
    pub default: Option<String>,
}

// ---------------------------------------------------------------------------
// Compiled form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Transform {
    Lowercase,
    Trim,
    UnderscoreToDot,
    UnderscoreToSpace,
    /// `PowerPC` → `ppc`, `PPC64` → `ppc64`.
    Ppc,
    StripNonNumericRuns,
    WindowsVersion,
    Lookup(Lookup),
}

/// Post-processing step bound to one output field of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Mapper {
    pub field: Field,
    pub transform: Transform,
}

impl Mapper {
    pub fn from_entry(entry: MapperEntry) -> Result<Self> {
        let transform = match entry.apply.as_str() {
            "lowercase" => Transform::Lowercase,
            "trim" => Transform::Trim,
            "underscore_to_dot" => Transform::UnderscoreToDot,
            "underscore_to_space" => Transform::UnderscoreToSpace,
            "ppc" => Transform::Ppc,
            "strip_non_numeric_runs" => Transform::StripNonNumericRuns,
            "windows_version" => Transform::WindowsVersion,
            "lookup" => {
                let table = entry.table.ok_or_else(|| Error::InvalidMapper {
                    name: entry.apply.clone(),
                    what: "table",
                })?;
                Transform::Lookup(Lookup::new(table, entry.default))
            }
            other => return Err(Error::UnknownMapper(other.to_string())),
        };
        Ok(Mapper {
            field: entry.field,
            transform,
        })
    }

    pub fn apply(&self, value: &str) -> String {
        self.transform.apply(value)
    }
}

impl Transform {
    pub fn apply(&self, value: &str) -> String {
        match self {
            Transform::Lowercase => value.to_lowercase(),
            Transform::Trim => value.trim().to_string(),
            Transform::UnderscoreToDot => value.replace('_', "."),
            Transform::UnderscoreToSpace => value.replace('_', " "),
            Transform::Ppc => value.replace("ower", "").to_lowercase(),
            Transform::StripNonNumericRuns => strip_non_numeric_runs(value),
            Transform::WindowsVersion => windows_version(value),
            Transform::Lookup(lookup) => lookup.get(value).to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup tables
// ---------------------------------------------------------------------------

/// Case-insensitive substring table: the first key with a needle contained in
/// the input wins. Keys are tried in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Lookup {
    entries: Vec<(String, Vec<String>)>,
    default: Option<String>,
}

impl Lookup {
    pub fn new(table: IndexMap<String, Vec<String>>, default: Option<String>) -> Self {
        let entries = table
            .into_iter()
            .map(|(key, needles)| {
                let needles = needles.into_iter().map(|n| n.to_lowercase()).collect();
                (key, needles)
            })
            .collect();
        Lookup { entries, default }
    }

    pub fn from_pairs(pairs: &[(&str, &[&str])], default: Option<&str>) -> Self {
        let table = pairs
            .iter()
            .map(|(key, needles)| {
                (
                    key.to_string(),
                    needles.iter().map(|n| n.to_string()).collect(),
                )
            })
            .collect();
        Lookup::new(table, default.map(str::to_string))
    }

    /// The matching key, the default, or `value` itself when neither applies.
    pub fn get<'a>(&'a self, value: &'a str) -> &'a str {
        self.find(value)
            .or(self.default.as_deref())
            .unwrap_or(value)
    }

    /// The matching key only.
    pub fn find(&self, value: &str) -> Option<&str> {
        let lowered = value.to_lowercase();
        self.entries
            .iter()
            .find(|(_, needles)| needles.iter().any(|n| lowered.contains(n.as_str())))
            .map(|(key, _)| key.as_str())
    }
}

// ---------------------------------------------------------------------------
// String transforms
// ---------------------------------------------------------------------------

/// Remove every run of characters outside `[0-9.]` together with the
/// character that follows it: `22.lts.3.306369-gold` → `22.3.306369`.
fn strip_non_numeric_runs(value: &str) -> String {
    let keep = |c: &char| c.is_ascii_digit() || *c == '.';
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());
    let mut i = 0;

    while i < chars.len() {
        if keep(&chars[i]) {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let run_end = chars[i..]
            .iter()
            .position(keep)
            .map_or(chars.len(), |p| i + p);
        if run_end < chars.len() {
            i = run_end + 1;
        } else if run_end - i >= 2 {
            // At end of input the last char of the run stands in for the trailing one.
            i = run_end;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Windows version tokens as they appear after `Windows `: `NT 10.0` → `10.0`,
/// `4.90` → `ME`, `ARM` → `RT`.
fn windows_version(value: &str) -> String {
    let value = value.trim();
    if value.contains("4.90") {
        return "ME".to_string();
    }
    if value.to_ascii_lowercase().contains("arm") {
        return "RT".to_string();
    }
    match value.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("nt") => value[2..].trim_start().to_string(),
        _ => value.to_string(),
    }
}
