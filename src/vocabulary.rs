use aho_corasick::AhoCorasick;

use crate::error::Result;

/// A case-insensitive substring vocabulary. Needles are grouped under labels;
/// an earlier group wins over a later one no matter where in the text each
/// occurs, and within a group the leftmost occurrence wins.
#[derive(Debug, Clone)]
pub(crate) struct Vocabulary<L: 'static> {
    automaton: AhoCorasick,
    // Indexed by pattern id: (group rank, label).
    labels: Vec<(usize, L)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Hit<'t, L> {
    pub label: L,
    /// The matched text as it appears in the haystack.
    pub needle: &'t str,
    pub end: usize,
}

impl<L: Copy> Vocabulary<L> {
    pub fn build(groups: &[(L, &[&str])]) -> Result<Self> {
        let mut needles = Vec::new();
        let mut labels = Vec::new();
        for (rank, (label, words)) in groups.iter().enumerate() {
            for word in words.iter() {
                needles.push(*word);
                labels.push((rank, *label));
            }
        }
        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&needles)?;
        Ok(Vocabulary { automaton, labels })
    }

    pub fn find<'t>(&self, haystack: &'t str) -> Option<Hit<'t, L>> {
        self.automaton
            .find_overlapping_iter(haystack)
            .min_by_key(|m| (self.labels[m.pattern().as_usize()].0, m.start()))
            .map(|m| Hit {
                label: self.labels[m.pattern().as_usize()].1,
                needle: &haystack[m.start()..m.end()],
                end: m.end(),
            })
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.automaton.is_match(haystack)
    }
}
