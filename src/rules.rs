use std::fmt;
use std::path::Path;
use std::time::Instant;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::extension::Extension;
use crate::mapper::{Mapper, MapperEntry};
use crate::template::Template;

// ---------------------------------------------------------------------------
// Categories and fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Browser,
    Engine,
    Os,
    Device,
    Cpu,
}

impl Category {
    /// Detection order.
    pub const ALL: [Category; 5] = [
        Category::Browser,
        Category::Engine,
        Category::Device,
        Category::Os,
        Category::Cpu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Engine => "engine",
            Self::Os => "os",
            Self::Device => "device",
            Self::Cpu => "cpu",
        }
    }

    fn file_name(&self) -> &'static str {
        match self {
            Self::Browser => "browser.yml",
            Self::Engine => "engine.yml",
            Self::Os => "os.yml",
            Self::Device => "device.yml",
            Self::Cpu => "cpu.yml",
        }
    }

    fn builtin_source(&self) -> &'static str {
        match self {
            Self::Browser => include_str!("../rules/browser.yml"),
            Self::Engine => include_str!("../rules/engine.yml"),
            Self::Os => include_str!("../rules/os.yml"),
            Self::Device => include_str!("../rules/device.yml"),
            Self::Cpu => include_str!("../rules/cpu.yml"),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output field a rule can populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Version,
    Type,
    Vendor,
    Model,
    Architecture,
}

// ---------------------------------------------------------------------------
// Rule entries  (rules/*.yml)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RuleEntry {
    pub patterns: Vec<String>,
    pub output: IndexMap<Field, String>,
    #[serde(default)]
    pub mappers: Vec<MapperEntry>,
}

/// Alternative patterns, an output template per field and the mappers that
/// post-process those fields.
#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) patterns: Vec<String>,
    pub(crate) output: Vec<(Field, Template)>,
    pub(crate) mappers: Vec<Mapper>,
}

impl Rule {
    pub(crate) fn from_entry(entry: RuleEntry, category: Category, index: usize) -> Result<Self> {
        if entry.patterns.is_empty() {
            return Err(Error::EmptyRule {
                category: category.as_str(),
                index,
            });
        }
        let output = entry
            .output
            .into_iter()
            .map(|(field, tpl)| (field, Template::parse(&tpl)))
            .collect();
        let mappers = entry
            .mappers
            .into_iter()
            .map(Mapper::from_entry)
            .collect::<Result<Vec<_>>>()?;

        Ok(Rule {
            patterns: entry.patterns,
            output,
            mappers,
        })
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.output.iter().map(|(field, _)| *field)
    }
}

pub(crate) fn compile_entries(entries: Vec<RuleEntry>, category: Category) -> Result<Vec<Rule>> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| Rule::from_entry(entry, category, index))
        .collect()
}

fn parse_rules(source: &str, category: Category) -> Result<Vec<Rule>> {
    let entries: Vec<RuleEntry> = serde_yaml::from_str(source)?;
    compile_entries(entries, category)
}

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// Ordered rule lists for every category. Order is precedence: the first rule
/// with a matching pattern decides the category's fields.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    browser: Vec<Rule>,
    engine: Vec<Rule>,
    os: Vec<Rule>,
    device: Vec<Rule>,
    cpu: Vec<Rule>,
}

impl RuleSet {
    /// The rule tables compiled into the crate.
    pub fn builtin() -> Result<Self> {
        Self::load(|category| Ok(category.builtin_source().into()))
    }

    /// Load `browser.yml`, `engine.yml`, `os.yml`, `device.yml` and `cpu.yml`
    /// from `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Self::load(|category| {
            let path = dir.join(category.file_name());
            std::fs::read_to_string(&path)
                .map(Into::into)
                .map_err(|e| Error::from(e).in_file(&path))
        })
        .map_err(|e| match e {
            Error::Rules { .. } => e,
            other => other.in_file(dir),
        })
    }

    fn load<F>(read: F) -> Result<Self>
    where
        F: Fn(Category) -> Result<std::borrow::Cow<'static, str>> + Sync,
    {
        let t = Instant::now();

        // Categories are independent, parse them concurrently.
        let tables = Category::ALL
            .par_iter()
            .map(|&category| -> Result<_> {
                let source = read(category)?;
                Ok((category, parse_rules(&source, category)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut set = RuleSet::default();
        for (category, rules) in tables {
            *set.rules_mut(category) = rules;
        }

        tracing::debug!(rules = set.len(), elapsed = ?t.elapsed(), "rule set loaded");
        Ok(set)
    }

    pub fn rules(&self, category: Category) -> &[Rule] {
        match category {
            Category::Browser => &self.browser,
            Category::Engine => &self.engine,
            Category::Os => &self.os,
            Category::Device => &self.device,
            Category::Cpu => &self.cpu,
        }
    }

    fn rules_mut(&mut self, category: Category) -> &mut Vec<Rule> {
        match category {
            Category::Browser => &mut self.browser,
            Category::Engine => &mut self.engine,
            Category::Os => &mut self.os,
            Category::Device => &mut self.device,
            Category::Cpu => &mut self.cpu,
        }
    }

    /// Prepend extension rules ahead of the current ones. Extensions keep the
    /// order they are given in.
    pub fn with_extensions<'a>(mut self, extensions: impl IntoIterator<Item = &'a Extension>) -> Self {
        let extensions: Vec<&Extension> = extensions.into_iter().collect();
        if extensions.is_empty() {
            return self;
        }
        for category in Category::ALL {
            let mut merged: Vec<Rule> = extensions
                .iter()
                .flat_map(|ext| ext.rules(category).iter().cloned())
                .collect();
            if merged.is_empty() {
                continue;
            }
            let current = self.rules_mut(category);
            merged.append(current);
            *current = merged;
        }
        self
    }

    /// Total number of rules across all categories.
    pub fn len(&self) -> usize {
        Category::ALL.iter().map(|c| self.rules(*c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn patterns(&self) -> impl Iterator<Item = &str> {
        Category::ALL
            .into_iter()
            .flat_map(move |c| self.rules(c).iter().flat_map(Rule::patterns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_load_in_declaration_order() {
        let set = RuleSet::builtin().unwrap();
        for category in Category::ALL {
            assert!(!set.rules(category).is_empty(), "{category} rules empty");
        }

        let first_browser: Vec<_> = set.rules(Category::Browser)[0].patterns().collect();
        assert_eq!(first_browser, [r"(?i)\b(?:crmo|crios)\/([\w\.]+)"]);

        let cpu: Vec<_> = set.rules(Category::Cpu)[0].fields().collect();
        assert_eq!(cpu, [Field::Architecture]);
    }

    #[test]
    fn rule_entry_validation() {
        let yaml = "- patterns: []\n  output:\n    name: X\n";
        let err = parse_rules(yaml, Category::Browser).unwrap_err();
        assert!(matches!(err, Error::EmptyRule { category: "browser", index: 0 }));

        let yaml = "- patterns: ['x']\n  output:\n    name: X\n  mappers:\n    - field: name\n      apply: shout\n";
        assert!(matches!(
            parse_rules(yaml, Category::Browser),
            Err(Error::UnknownMapper(_))
        ));
    }

    #[test]
    fn templates_are_parsed_once() {
        let yaml = "- patterns: ['(?i)(avast)/([\\w.]+)']\n  output:\n    name: '$1 Secure Browser'\n    version: '$2'\n";
        let rules = parse_rules(yaml, Category::Browser).unwrap();
        assert_eq!(rules[0].output[1], (Field::Version, Template::Backref(2)));
    }

    #[test]
    fn from_dir_reports_missing_file() {
        let err = RuleSet::from_dir("does/not/exist").unwrap_err();
        assert!(matches!(err, Error::Rules { .. }));
        assert!(err.to_string().contains("does/not/exist"));
    }

    #[test]
    fn from_dir_matches_builtin() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("rules");
        let loaded = RuleSet::from_dir(dir).unwrap();
        let builtin = RuleSet::builtin().unwrap();
        assert_eq!(loaded.len(), builtin.len());
    }
}
