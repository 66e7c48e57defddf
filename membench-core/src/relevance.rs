//! Pack-agnostic relevance primitives shared by packs and metrics.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::SearchResult;
use crate::keys;
use crate::text::{stemmed_keywords, tokenize};

// ===== Line spans =====

/// 1-indexed inclusive line span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: u32,
    pub end: u32,
}

impl LineSpan {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

pub fn spans_overlap(a: LineSpan, b: LineSpan) -> bool {
    a.start <= b.end && b.start <= a.end
}

/// Intersection-over-union of two line spans; 0 on no overlap.
pub fn span_iou(a: LineSpan, b: LineSpan) -> f64 {
    if !spans_overlap(a, b) {
        return 0.0;
    }
    let intersection = (a.end.min(b.end) - a.start.max(b.start) + 1) as f64;
    let union = (a.len() + b.len()) as f64 - intersection;
    intersection / union
}

// ===== Path matching =====

fn normalize_path(path: &str) -> String {
    path.to_lowercase()
        .replace('\\', "/")
        .trim_start_matches('/')
        .to_string()
}

/// Case-insensitive path equality or suffix match on a `/` boundary, so
/// `oauth.py` never matches `auth.py`.
pub fn paths_match(a: &str, b: &str) -> bool {
    let a = normalize_path(a);
    let b = normalize_path(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    let (longer, shorter) = if a.len() > b.len() { (&a, &b) } else { (&b, &a) };
    longer.ends_with(shorter.as_str())
        && longer.as_bytes()[longer.len() - shorter.len() - 1] == b'/'
}

// ===== Jaccard =====

/// Token-set Jaccard similarity. Both empty -> 1.0; one empty -> 0.0.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let set_a: HashSet<String> = tokenize(a).into_iter().collect();
    let set_b: HashSet<String> = tokenize(b).into_iter().collect();
    match (set_a.is_empty(), set_b.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => {
            let intersection = set_a.intersection(&set_b).count() as f64;
            let union = set_a.union(&set_b).count() as f64;
            intersection / union
        }
    }
}

// ===== Dialog-id extraction =====

fn dialog_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"D\d+:\d+").expect("static pattern"))
}

fn find_dialog_ids(text: &str) -> Vec<String> {
    dialog_id_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Parses a `[CTXID:<ids>]` content prefix: the comma-separated ids and
/// the remaining content.
pub fn parse_ctxid_prefix(content: &str) -> Option<(Vec<String>, &str)> {
    let rest = content.strip_prefix("[CTXID:")?;
    let close = rest.find(']')?;
    let ids = rest[..close]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    Some((ids, rest[close + 1..].trim_start()))
}

/// Dialog ids for one retrieved chunk, in tier order: provider metadata,
/// `[CTXID:...]` content prefix, chunk id, raw content. The first
/// non-empty tier wins.
pub fn extract_dialog_ids(result: &SearchResult) -> Vec<String> {
    let tier1: Vec<String> = result
        .metadata_strings(keys::DIALOG_IDS)
        .iter()
        .flat_map(|s| find_dialog_ids(s))
        .collect();
    if !tier1.is_empty() {
        return tier1;
    }

    if let Some((ids, _)) = parse_ctxid_prefix(&result.content) {
        let tier2: Vec<String> = ids.iter().flat_map(|s| find_dialog_ids(s)).collect();
        if !tier2.is_empty() {
            return tier2;
        }
    }

    let tier3 = find_dialog_ids(&result.id);
    if !tier3.is_empty() {
        return tier3;
    }

    find_dialog_ids(&result.content)
}

/// Exact set membership of any evidence id among the chunk's dialog ids.
pub fn evidence_match(evidence: &[String], result: &SearchResult) -> bool {
    if evidence.is_empty() {
        return false;
    }
    let found: HashSet<String> = extract_dialog_ids(result).into_iter().collect();
    evidence.iter().any(|id| found.contains(id))
}

/// Bounded fallback for items with no id channel at all: substring match
/// for short answers, >=50% stemmed keyword overlap for long ones.
pub fn answer_text_fallback(answer: &str, content: &str) -> bool {
    let answer = answer.trim();
    if answer.is_empty() {
        return false;
    }

    const SHORT_ANSWER_TOKENS: usize = 5;
    if tokenize(answer).len() <= SHORT_ANSWER_TOKENS {
        return content.to_lowercase().contains(&answer.to_lowercase());
    }

    let keywords = stemmed_keywords(answer);
    if keywords.is_empty() {
        return false;
    }
    let content_tokens: HashSet<String> = stemmed_keywords(content).into_iter().collect();
    let matched = keywords
        .iter()
        .filter(|k| content_tokens.contains(k.as_str()))
        .count();
    matched as f64 / keywords.len() as f64 >= 0.5
}
