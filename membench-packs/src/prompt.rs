//! Prompt rendering with stable content hashes.

use membench_core::domain::SearchResult;
use membench_core::hash::sha256_hex;
use membench_core::traits::RenderedPrompt;

/// Substitutes `{key}` placeholders and hashes the rendered text.
/// Placeholders with no substitution survive verbatim.
pub fn render(template: &str, substitutions: &[(&str, &str)]) -> RenderedPrompt {
    let mut text = template.to_string();
    for (key, value) in substitutions {
        text = text.replace(&format!("{{{key}}}"), value);
    }
    RenderedPrompt {
        sha256: sha256_hex(&text),
        text,
    }
}

/// Numbered context block from retrieved chunks, dates included when the
/// provider preserved them.
pub fn format_contexts(retrieved: &[SearchResult]) -> String {
    retrieved
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let date = result
                .metadata
                .get("date")
                .and_then(serde_json::Value::as_str);
            match date {
                Some(date) => format!("[{}] ({date}) {}", i + 1, result.content),
                None => format!("[{}] {}", i + 1, result.content),
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_is_deterministic() {
        let a = render("Q: {question}", &[("question", "why?")]);
        let b = render("Q: {question}", &[("question", "why?")]);
        assert_eq!(a.text, "Q: why?");
        assert_eq!(a.sha256, b.sha256);
        assert_eq!(a.sha256.len(), 64);
    }

    #[test]
    fn unknown_placeholders_survive() {
        let rendered = render("{question} / {unbound}", &[("question", "q")]);
        assert_eq!(rendered.text, "q / {unbound}");
    }

    #[test]
    fn contexts_are_numbered() {
        let retrieved = vec![
            SearchResult::new("a", "first chunk", 0.9),
            SearchResult::new("b", "second chunk", 0.5)
                .with_metadata("date", serde_json::json!("2023-05-01")),
        ];
        let block = format_contexts(&retrieved);
        assert!(block.starts_with("[1] first chunk"));
        assert!(block.contains("[2] (2023-05-01) second chunk"));
    }
}
