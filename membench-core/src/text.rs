//! Answer normalization and token scoring.
//!
//! Normalization follows the conversational-QA convention: lowercase,
//! strip punctuation, drop articles, Porter-stem every token. The stemmer
//! is the classic Porter algorithm, self-contained.

use std::collections::HashMap;

/// Lowercase, non-alphanumeric to space, split on whitespace.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

const ARTICLES: [&str; 3] = ["a", "an", "the"];

/// Normalized, stemmed tokens of an answer string.
pub fn normalize_answer(text: &str) -> Vec<String> {
    tokenize(&text.replace(',', " "))
        .into_iter()
        .filter(|t| !ARTICLES.contains(&t.as_str()))
        .map(|t| porter_stem(&t))
        .collect()
}

/// Multiset token F1 between two token lists.
pub fn token_f1(predicted: &[String], reference: &[String]) -> f64 {
    if predicted.is_empty() && reference.is_empty() {
        return 1.0;
    }
    if predicted.is_empty() || reference.is_empty() {
        return 0.0;
    }

    let mut ref_counts: HashMap<&str, usize> = HashMap::new();
    for token in reference {
        *ref_counts.entry(token.as_str()).or_insert(0) += 1;
    }

    let mut overlap = 0usize;
    for token in predicted {
        if let Some(count) = ref_counts.get_mut(token.as_str()) {
            if *count > 0 {
                *count -= 1;
                overlap += 1;
            }
        }
    }

    if overlap == 0 {
        return 0.0;
    }

    let precision = overlap as f64 / predicted.len() as f64;
    let recall = overlap as f64 / reference.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

/// Fraction of `expected` tokens present in `content` (set semantics).
/// Used by coverage-style recall so large chunks are not penalized.
pub fn token_coverage(expected: &[String], content: &[String]) -> f64 {
    if expected.is_empty() {
        return 0.0;
    }
    let content: std::collections::HashSet<&str> =
        content.iter().map(String::as_str).collect();
    let covered = expected
        .iter()
        .filter(|t| content.contains(t.as_str()))
        .count();
    covered as f64 / expected.len() as f64
}

/// Stemmed keywords of 3+ characters, for bounded answer-text matching.
pub fn stemmed_keywords(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.len() >= 3)
        .map(|t| porter_stem(&t))
        .collect()
}

// ===== Porter stemmer =====

/// Classic Porter stemming. Words of one or two letters pass through.
pub fn porter_stem(word: &str) -> String {
    let word = word.to_lowercase();
    if word.len() <= 2 || !word.chars().all(|c| c.is_ascii_alphabetic()) {
        return word;
    }

    let mut w: Vec<u8> = word.into_bytes();
    step_1a(&mut w);
    step_1b(&mut w);
    step_1c(&mut w);
    step_2(&mut w);
    step_3(&mut w);
    step_4(&mut w);
    step_5(&mut w);
    String::from_utf8(w).expect("stemmer operates on ascii")
}

fn is_consonant(w: &[u8], i: usize) -> bool {
    match w[i] {
        b'a' | b'e' | b'i' | b'o' | b'u' => false,
        b'y' => i == 0 || !is_consonant(w, i - 1),
        _ => true,
    }
}

/// The measure m of a stem: the number of VC sequences in [C](VC)^m[V].
fn measure(w: &[u8]) -> usize {
    let mut m = 0;
    let mut i = 0;
    let n = w.len();
    while i < n && is_consonant(w, i) {
        i += 1;
    }
    loop {
        while i < n && !is_consonant(w, i) {
            i += 1;
        }
        if i >= n {
            return m;
        }
        m += 1;
        while i < n && is_consonant(w, i) {
            i += 1;
        }
        if i >= n {
            return m;
        }
    }
}

fn has_vowel(w: &[u8]) -> bool {
    (0..w.len()).any(|i| !is_consonant(w, i))
}

fn ends_double_consonant(w: &[u8]) -> bool {
    let n = w.len();
    n >= 2 && w[n - 1] == w[n - 2] && is_consonant(w, n - 1)
}

/// Ends consonant-vowel-consonant where the final consonant is not w, x, y.
fn ends_cvc(w: &[u8]) -> bool {
    let n = w.len();
    n >= 3
        && is_consonant(w, n - 3)
        && !is_consonant(w, n - 2)
        && is_consonant(w, n - 1)
        && !matches!(w[n - 1], b'w' | b'x' | b'y')
}

fn ends_with(w: &[u8], suffix: &str) -> bool {
    w.len() >= suffix.len() && &w[w.len() - suffix.len()..] == suffix.as_bytes()
}

fn stem_measure(w: &[u8], suffix: &str) -> usize {
    measure(&w[..w.len() - suffix.len()])
}

fn replace_suffix(w: &mut Vec<u8>, suffix: &str, replacement: &str) {
    let at = w.len() - suffix.len();
    w.truncate(at);
    w.extend_from_slice(replacement.as_bytes());
}

fn step_1a(w: &mut Vec<u8>) {
    if ends_with(w, "sses") {
        replace_suffix(w, "sses", "ss");
    } else if ends_with(w, "ies") {
        replace_suffix(w, "ies", "i");
    } else if !ends_with(w, "ss") && ends_with(w, "s") {
        replace_suffix(w, "s", "");
    }
}

fn step_1b(w: &mut Vec<u8>) {
    if ends_with(w, "eed") {
        if stem_measure(w, "eed") > 0 {
            replace_suffix(w, "eed", "ee");
        }
        return;
    }

    let stripped = if ends_with(w, "ed") && has_vowel(&w[..w.len() - 2]) {
        replace_suffix(w, "ed", "");
        true
    } else if ends_with(w, "ing") && has_vowel(&w[..w.len() - 3]) {
        replace_suffix(w, "ing", "");
        true
    } else {
        false
    };

    if !stripped {
        return;
    }

    if ends_with(w, "at") || ends_with(w, "bl") || ends_with(w, "iz") {
        w.push(b'e');
    } else if ends_double_consonant(w) && !matches!(w[w.len() - 1], b'l' | b's' | b'z') {
        w.pop();
    } else if measure(w) == 1 && ends_cvc(w) {
        w.push(b'e');
    }
}

fn step_1c(w: &mut Vec<u8>) {
    if ends_with(w, "y") && has_vowel(&w[..w.len() - 1]) {
        let n = w.len();
        w[n - 1] = b'i';
    }
}

const STEP_2_RULES: [(&str, &str); 20] = [
    ("ational", "ate"),
    ("tional", "tion"),
    ("enci", "ence"),
    ("anci", "ance"),
    ("izer", "ize"),
    ("abli", "able"),
    ("alli", "al"),
    ("entli", "ent"),
    ("eli", "e"),
    ("ousli", "ous"),
    ("ization", "ize"),
    ("ation", "ate"),
    ("ator", "ate"),
    ("alism", "al"),
    ("iveness", "ive"),
    ("fulness", "ful"),
    ("ousness", "ous"),
    ("aliti", "al"),
    ("iviti", "ive"),
    ("biliti", "ble"),
];

fn step_2(w: &mut Vec<u8>) {
    for (suffix, replacement) in STEP_2_RULES {
        if ends_with(w, suffix) {
            if stem_measure(w, suffix) > 0 {
                replace_suffix(w, suffix, replacement);
            }
            return;
        }
    }
}

const STEP_3_RULES: [(&str, &str); 7] = [
    ("icate", "ic"),
    ("ative", ""),
    ("alize", "al"),
    ("iciti", "ic"),
    ("ical", "ic"),
    ("ful", ""),
    ("ness", ""),
];

fn step_3(w: &mut Vec<u8>) {
    for (suffix, replacement) in STEP_3_RULES {
        if ends_with(w, suffix) {
            if stem_measure(w, suffix) > 0 {
                replace_suffix(w, suffix, replacement);
            }
            return;
        }
    }
}

const STEP_4_SUFFIXES: [&str; 18] = [
    "ement", "ance", "ence", "able", "ible", "ment", "ent", "ism", "ate", "iti", "ous",
    "ive", "ize", "ion", "al", "er", "ic", "ou",
];

fn step_4(w: &mut Vec<u8>) {
    for suffix in STEP_4_SUFFIXES {
        if !ends_with(w, suffix) {
            continue;
        }
        let stem_len = w.len() - suffix.len();
        if suffix == "ion" && !(stem_len > 0 && matches!(w[stem_len - 1], b's' | b't')) {
            continue;
        }
        if measure(&w[..stem_len]) > 1 {
            w.truncate(stem_len);
        }
        return;
    }
}

fn step_5(w: &mut Vec<u8>) {
    // 5a
    if ends_with(w, "e") {
        let stem = &w[..w.len() - 1];
        let m = measure(stem);
        if m > 1 || (m == 1 && !ends_cvc(stem)) {
            w.pop();
        }
    }
    // 5b
    if ends_with(w, "ll") && measure(w) > 1 {
        w.pop();
    }
}
