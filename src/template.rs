use std::borrow::Cow;

/// Output template of a rule field, parsed once when the rule is built.
///
/// `"$1"` parses to `Backref(1)`, `"Opera GX"` to `Literal`, and mixed text
/// such as `"$1 Secure Browser"` to a `Compound` of both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Template {
    Literal(String),
    Backref(usize),
    Compound(Vec<Template>),
}

impl Template {
    pub fn parse(src: &str) -> Self {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = src;

        while let Some(idx) = rest.find('$') {
            let after = &rest[idx + 1..];
            let digits = after.bytes().take_while(u8::is_ascii_digit).count();
            // A lone `$` (or one followed by a non-digit) is plain text.
            let group = match after[..digits].parse::<usize>() {
                Ok(group) if digits > 0 => group,
                _ => {
                    literal.push_str(&rest[..=idx]);
                    rest = after;
                    continue;
                }
            };

            literal.push_str(&rest[..idx]);
            if !literal.is_empty() {
                parts.push(Template::Literal(std::mem::take(&mut literal)));
            }
            parts.push(Template::Backref(group));
            rest = &after[digits..];
        }
        literal.push_str(rest);
        if !literal.is_empty() || parts.is_empty() {
            parts.push(Template::Literal(literal));
        }

        if parts.len() == 1 {
            parts.pop().unwrap_or(Template::Literal(String::new()))
        } else {
            Template::Compound(parts)
        }
    }

    /// Substitute capture groups and trim surrounding whitespace.
    ///
    /// A group that is out of range, or that did not take part in the match,
    /// resolves to an empty string.
    pub fn resolve<'a>(&'a self, groups: &[Option<&'a str>]) -> Cow<'a, str> {
        let resolved = match self {
            Template::Literal(s) => Cow::Borrowed(s.as_str()),
            Template::Backref(n) => Cow::Borrowed(group(groups, *n)),
            Template::Compound(parts) => {
                let mut out = String::new();
                for part in parts {
                    out.push_str(&part.resolve_raw(groups));
                }
                Cow::Owned(out)
            }
        };
        trim_cow(resolved)
    }

    fn resolve_raw<'a>(&'a self, groups: &[Option<&'a str>]) -> Cow<'a, str> {
        match self {
            Template::Literal(s) => Cow::Borrowed(s.as_str()),
            Template::Backref(n) => Cow::Borrowed(group(groups, *n)),
            Template::Compound(_) => self.resolve(groups),
        }
    }
}

fn group<'a>(groups: &[Option<&'a str>], n: usize) -> &'a str {
    groups.get(n).copied().flatten().unwrap_or("")
}

fn trim_cow(value: Cow<'_, str>) -> Cow<'_, str> {
    match value {
        Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
        Cow::Owned(s) if s.trim().len() == s.len() => Cow::Owned(s),
        Cow::Owned(s) => Cow::Owned(s.trim().to_string()),
    }
}
