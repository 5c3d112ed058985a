use crate::pattern::{Groups, PatternCache};
use crate::rules::{Field, Rule};

/// Field values produced by one rule match. Absent fields read as `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Fields {
    values: Vec<(Field, String)>,
}

impl Fields {
    pub fn get(&self, field: Field) -> &str {
        self.values
            .iter()
            .find(|(f, _)| *f == field)
            .map_or("", |(_, v)| v.as_str())
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match self.values.iter_mut().find(|(f, _)| *f == field) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((field, value)),
        }
    }

    /// Move a field out, leaving `""` behind.
    pub fn take(&mut self, field: Field) -> String {
        self.values
            .iter_mut()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| std::mem::take(v))
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|(_, v)| v.is_empty())
    }
}

/// Evaluate `rules` against `subject`: rules in order, each rule's patterns
/// in order, and the first pattern that matches decides the result.
pub(crate) fn apply(rules: &[Rule], subject: &str, cache: &PatternCache) -> Fields {
    for rule in rules {
        for src in &rule.patterns {
            // Patterns neither engine accepts are simply skipped.
            let Some(pattern) = cache.get(src) else {
                continue;
            };
            if let Some(groups) = pattern.captures(subject) {
                return resolve(rule, &groups);
            }
        }
    }
    Fields::default()
}

fn resolve(rule: &Rule, groups: &Groups<'_>) -> Fields {
    let mut fields = Fields::default();
    for (field, template) in &rule.output {
        fields.set(*field, template.resolve(groups).into_owned());
    }
    // Each mapper sees its own field only, in declaration order.
    for mapper in &rule.mappers {
        let mapped = mapper.apply(fields.get(mapper.field));
        fields.set(mapper.field, mapped);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{compile_entries, Category, RuleEntry};

    fn rules(yaml: &str) -> Vec<Rule> {
        let entries: Vec<RuleEntry> = serde_yaml::from_str(yaml).unwrap();
        compile_entries(entries, Category::Browser).unwrap()
    }

    const TABLE: &str = r#"
- patterns:
    - '(?i)(opera mini)\/([-\w\.]+)'
    - '(?i)(opera)(?:.+Version\/|[\/ ]+)([\w\.]+)'
  output:
    name: '$1'
    version: '$2'
- patterns:
    - '(?i)(cobalt)\/([\w\.]+)'
  output:
    name: '$1'
    version: '$2'
  mappers:
    - field: version
      apply: strip_non_numeric_runs
    - field: name
      apply: lowercase
- patterns:
    - '(?i)(firefox)\/([\w\.]+)'
  output:
    name: Firefox
    version: '$2'
"#;

    #[test]
    fn first_match_wins() {
        let cache = PatternCache::default();
        let rules = rules(TABLE);

        let f = apply(&rules, "Opera/9.80 (J2ME/MIDP; Opera Mini/5.1.21214) Firefox/3.0", &cache);
        assert_eq!(f.get(Field::Name), "Opera Mini");
        assert_eq!(f.get(Field::Version), "5.1.21214");

        let f = apply(&rules, "Mozilla/5.0 (X11; Linux) Firefox/115.0", &cache);
        assert_eq!(f.get(Field::Name), "Firefox");
        assert_eq!(f.get(Field::Version), "115.0");
    }

    #[test]
    fn mappers_run_per_field() {
        let cache = PatternCache::default();
        let f = apply(&rules(TABLE), "Cobalt/22.lts.3.306369-gold", &cache);
        assert_eq!(f.get(Field::Name), "cobalt");
        assert_eq!(f.get(Field::Version), "22.3.306369");
    }

    #[test]
    fn broken_pattern_is_skipped() {
        let cache = PatternCache::default();
        let table = "- patterns: ['(broken', '(?i)(curl)\\/([\\w.]+)']\n  output:\n    name: '$1'\n    version: '$2'\n";
        let f = apply(&rules(table), "curl/8.4.0", &cache);
        assert_eq!(f.get(Field::Name), "curl");
        assert_eq!(f.get(Field::Version), "8.4.0");
    }

    #[test]
    fn no_match_yields_empty_fields() {
        let cache = PatternCache::default();
        let f = apply(&rules(TABLE), "nothing to see", &cache);
        assert!(f.is_empty());
        assert_eq!(f.get(Field::Model), "");
    }

    #[test]
    fn fields_set_and_take() {
        let mut f = Fields::default();
        f.set(Field::Vendor, "Apple");
        f.set(Field::Vendor, "Google");
        assert_eq!(f.get(Field::Vendor), "Google");
        assert_eq!(f.take(Field::Vendor), "Google");
        assert!(f.is_empty());
    }
}
