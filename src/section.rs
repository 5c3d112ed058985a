/// One `name/version (comment; comment; ...)` unit of a User-Agent string.
///
/// Every field borrows from the input, so tokenizing allocates only the
/// `comments` vector of each section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Section<'a> {
    pub name: &'a str,
    pub version: &'a str,
    /// Raw text inside the first balanced parenthesis group.
    pub comment: &'a str,
    /// `comment` split on `"; "`. Empty when the section had no parenthesis group.
    pub comments: Vec<&'a str>,
}

impl<'a> Section<'a> {
    pub fn comment_at(&self, idx: usize) -> Option<&'a str> {
        self.comments.get(idx).copied()
    }
}

/// Split `ua` into sections with a single forward scan.
pub(crate) fn tokenize(ua: &str) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    let mut pos = 0;
    while pos < ua.len() {
        sections.push(next_section(ua, &mut pos));
    }
    sections
}

/// Read from `*pos` up to `delimiter` (or end of input) and return the text
/// before it. With `nested`, each `(` seen swallows one extra delimiter, so
/// `a (b) c)` read until `)` yields `a (b) c`.
fn read_until<'a>(ua: &'a str, pos: &mut usize, delimiter: u8, nested: bool) -> &'a str {
    let bytes = ua.as_bytes();
    let start = *pos;
    let mut depth = 0usize;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if b == delimiter {
            if depth == 0 {
                *pos = i + 1;
                return ua.get(start..i).unwrap_or_default();
            }
            depth -= 1;
        } else if nested && b == b'(' {
            depth += 1;
        }
    }

    *pos = bytes.len();
    ua.get(start..).unwrap_or_default()
}

/// Step over the single space separating a closed group from the next
/// section. Anything else starts the next section as is.
fn skip_separator(ua: &str, pos: &mut usize) {
    if ua.as_bytes().get(*pos) == Some(&b' ') {
        *pos += 1;
    }
}

fn next_section<'a>(ua: &'a str, pos: &mut usize) -> Section<'a> {
    let bytes = ua.as_bytes();
    let mut section = Section::default();

    // Product token, unless the section starts straight with a comment or annotation.
    if *pos < bytes.len() && bytes[*pos] != b'(' && bytes[*pos] != b'[' {
        let product = read_until(ua, pos, b' ', false);
        (section.name, section.version) = product.split_once('/').unwrap_or((product, ""));
    }

    if *pos < bytes.len() && bytes[*pos] == b'(' {
        *pos += 1;
        section.comment = read_until(ua, pos, b')', true);
        section.comments = section.comment.split("; ").collect();
        skip_separator(ua, pos);
    }

    // Trailing `[...]` annotations are discarded.
    if *pos < bytes.len() && bytes[*pos] == b'[' {
        *pos += 1;
        read_until(ua, pos, b']', true);
        skip_separator(ua, pos);
    }

    section
}
