//! Text search and tag filtering over package lists.
//!
//! Text relevance is the best score of the query against a package's name,
//! author, description and title. Each field is scored two ways and the
//! higher score wins:
//!
//! - a fuzzy subsequence match (`nucleo-matcher`), normalized by the score
//!   the query achieves against itself;
//! - a typo score: for every query word, its closest word in the field by
//!   normalized Damerau-Levenshtein similarity (`strsim`), averaged.
//!
//! Both lie in `[0, 1]`. A package is kept when its relevance reaches
//! `1 - threshold`, so a threshold of `0` demands exact matches and `1`
//! keeps everything.

use std::{cmp::Ordering, collections::HashMap};

use nucleo_matcher::{
    pattern::{AtomKind, CaseMatching, Normalization, Pattern},
    Config, Matcher, Utf32Str,
};
use pkghub_config::config::DEFAULT_SEARCH_THRESHOLD;
use pkghub_registry::Package;
use serde::Serialize;
use strsim::normalized_damerau_levenshtein;
use tracing::{debug, trace};

/// How often a tag occurs across a package list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

struct Scorer {
    matcher: Matcher,
    pattern: Pattern,
    baseline: f64,
    tokens: Vec<String>,
    buf: Vec<char>,
}

impl Scorer {
    fn new(query: &str) -> Self {
        let mut matcher = Matcher::new(Config::DEFAULT);
        let pattern = Pattern::new(
            query,
            CaseMatching::Ignore,
            Normalization::Smart,
            AtomKind::Fuzzy,
        );
        let mut buf = Vec::new();
        let baseline = pattern
            .score(Utf32Str::new(query, &mut buf), &mut matcher)
            .unwrap_or(0);

        Self {
            matcher,
            pattern,
            baseline: f64::from(baseline),
            tokens: words(query),
            buf,
        }
    }

    fn fuzzy(&mut self, text: &str) -> f64 {
        if self.baseline <= 0.0 {
            return 0.0;
        }
        self.pattern
            .score(Utf32Str::new(text, &mut self.buf), &mut self.matcher)
            .map_or(0.0, |score| (f64::from(score) / self.baseline).min(1.0))
    }

    fn typo(&self, text: &str) -> f64 {
        let words = words(text);
        if self.tokens.is_empty() || words.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .tokens
            .iter()
            .map(|token| {
                words
                    .iter()
                    .map(|word| normalized_damerau_levenshtein(token, word))
                    .fold(0.0, f64::max)
            })
            .sum();
        total / self.tokens.len() as f64
    }

    fn field(&mut self, text: &str) -> f64 {
        self.fuzzy(text).max(self.typo(text))
    }

    fn relevance(&mut self, package: &Package) -> f64 {
        [
            &package.name,
            &package.author,
            &package.description,
            &package.title,
        ]
        .into_iter()
        .map(|field| self.field(field))
        .fold(0.0, f64::max)
    }
}

/// Ranks `packages` by relevance to `query` with the default threshold.
pub fn text_search(packages: Vec<Package>, query: &str) -> Vec<Package> {
    text_search_with_threshold(packages, query, DEFAULT_SEARCH_THRESHOLD)
}

/// Ranks `packages` by relevance to `query`, most relevant first. Equally
/// relevant packages keep their input order. A blank query returns the
/// input unchanged.
pub fn text_search_with_threshold(
    packages: Vec<Package>,
    query: &str,
    threshold: f64,
) -> Vec<Package> {
    let query = query.trim();
    if query.is_empty() {
        return packages;
    }

    let cutoff = 1.0 - threshold.clamp(0.0, 1.0);
    let mut scorer = Scorer::new(query);
    let total = packages.len();

    let mut ranked: Vec<(f64, Package)> = packages
        .into_iter()
        .filter_map(|package| {
            let relevance = scorer.relevance(&package);
            trace!(id = %package.id, relevance, "scored package");
            (relevance >= cutoff).then_some((relevance, package))
        })
        .collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    debug!(query, total, matched = ranked.len(), "text search");
    ranked.into_iter().map(|(_, package)| package).collect()
}

/// Keeps packages carrying at least one of `tags`, compared
/// case-insensitively. No tags returns the input unchanged.
pub fn filter_by_tags<S: AsRef<str>>(packages: Vec<Package>, tags: &[S]) -> Vec<Package> {
    if tags.is_empty() {
        return packages;
    }
    let wanted: Vec<String> = tags.iter().map(|t| t.as_ref().to_lowercase()).collect();

    packages
        .into_iter()
        .filter(|package| {
            package
                .tags
                .iter()
                .any(|tag| wanted.contains(&tag.to_lowercase()))
        })
        .collect()
}

/// Counts, per lowercased tag, the packages that carry it. Sorted by count
/// descending, then by tag.
pub fn count_tags(packages: &[Package]) -> Vec<TagCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for package in packages {
        let mut seen: Vec<String> = package.tags.iter().map(|t| t.to_lowercase()).collect();
        seen.sort_unstable();
        seen.dedup();
        for tag in seen {
            *counts.entry(tag).or_default() += 1;
        }
    }

    let mut counts: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    counts
}

/// Text search followed by tag filtering, so tag counts taken from the
/// result reflect the text query.
pub fn apply_filters<S: AsRef<str>>(
    packages: Vec<Package>,
    query: &str,
    tags: &[S],
    threshold: f64,
) -> Vec<Package> {
    let packages = text_search_with_threshold(packages, query, threshold);
    filter_by_tags(packages, tags)
}
