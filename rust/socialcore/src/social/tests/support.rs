//! Shared helpers: deterministic text generator and applier checks

use crate::social::scanner::MatchSet;
use crate::social::style::MemoryApplier;

/// Fragments chosen to hit token edges, multi-unit characters and clusters
pub const FRAGMENTS: &[&str] = &[
    "#rust", "@bob", " ", "  ", "\n", "word", "http://x.io/a", "www.site.com", "é", "😀", "＃タグ",
    "e\u{301}", "#", "@", ".", ",", "_x", "#a_b", "foo#bar", "a@b.c", "#café", "@Ünï", "https://",
    "(", ")", "!", "#1", "#1a", "👨\u{200d}👩", "rust-lang.org", "example.com/p", "docs.rs", ":80",
];

/// 64-bit LCG (Knuth MMIX constants)
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    pub fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n.max(1) as u64) as usize
    }

    pub fn fragment(&mut self) -> &'static str {
        FRAGMENTS[self.below(FRAGMENTS.len())]
    }

    pub fn text(&mut self, fragments: usize) -> String {
        (0..fragments).map(|_| self.fragment()).collect()
    }

    /// Random char boundary of `text`, end included
    pub fn boundary(&mut self, text: &str) -> usize {
        let boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).chain([text.len()]).collect();
        boundaries[self.below(boundaries.len())]
    }

    /// Insert, delete or replace at random positions
    pub fn edit(&mut self, text: &str) -> String {
        let a = self.boundary(text);
        let b = self.boundary(text);
        let (start, end) = (a.min(b), a.max(b));
        match self.below(3) {
            0 => format!("{}{}{}", &text[..a], self.fragment(), &text[a..]),
            1 => format!("{}{}", &text[..start], &text[end..]),
            _ => format!("{}{}{}", &text[..start], self.fragment(), &text[end..]),
        }
    }
}

/// Live annotations are exactly the match set
pub fn assert_mirrors(applier: &MemoryApplier, matches: &MatchSet) {
    let live: Vec<_> = applier.annotations().into_iter().cloned().collect();
    assert_eq!(live.as_slice(), matches.as_slice());
}
