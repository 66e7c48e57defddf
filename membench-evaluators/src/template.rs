//! Config-template rendering.
//!
//! Config prompt templates use `${name}` placeholders, which the config
//! loader's env interpolation deliberately leaves untouched. Unknown
//! placeholders survive verbatim.

use membench_core::domain::SearchResult;

pub fn fill(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut text = template.to_string();
    for (key, value) in substitutions {
        text = text.replace(&format!("${{{key}}}"), value);
    }
    text
}

/// Plain joined context block for config-templated prompts.
pub fn context_block(retrieved: &[SearchResult]) -> String {
    retrieved
        .iter()
        .map(|r| r.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
