//! Grounded prompt construction

use crate::retrieval::Passage;

/// Passages included in the prompt, taken in retrieval order
pub const MAX_PROMPT_PASSAGES: usize = 3;

/// Characters of each passage included in the prompt
pub const MAX_PASSAGE_CHARS: usize = 400;

/// Truncate to `max` characters, appending `...` when anything was cut
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn annotate(passage: &Passage) -> String {
    let text = truncate_with_ellipsis(&passage.text, MAX_PASSAGE_CHARS);
    match passage.page {
        Some(page) => format!("[{}, page {}]\n{}", passage.source, page, text),
        None => format!("[{}]\n{}", passage.source, text),
    }
}

/// Build the generation prompt from the question and retrieved passages
///
/// Passages are trusted to arrive best-first; only the first
/// [`MAX_PROMPT_PASSAGES`] are used and they are not re-sorted here.
pub fn build_prompt(query: &str, passages: &[Passage]) -> String {
    let context = passages
        .iter()
        .take(MAX_PROMPT_PASSAGES)
        .map(annotate)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"Answer the question using ONLY the information in the documents below.
Cite the sources (file and page).

DOCUMENTS:
{}

QUESTION: {}

ANSWER:"#,
        context, query
    )
}

/// Rough token estimate: four characters per token
///
/// This is not a tokenizer and undercounts non-Latin scripts.
pub fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() / 4) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(source: &str, text: &str, page: Option<u32>, score: f64) -> Passage {
        Passage {
            text: text.to_string(),
            source: source.to_string(),
            page,
            score,
            distance: 1.0 - score,
        }
    }

    #[test]
    fn test_uses_first_three_passages_in_order() {
        let passages = vec![
            passage("a.pdf", "alpha", Some(1), 0.2),
            passage("b.pdf", "beta", Some(2), 0.9),
            passage("c.pdf", "gamma", Some(3), 0.5),
            passage("d.pdf", "delta", Some(4), 0.99),
        ];
        let prompt = build_prompt("What?", &passages);

        assert!(prompt.contains("[a.pdf, page 1]\nalpha"));
        assert!(prompt.contains("[c.pdf, page 3]\ngamma"));
        assert!(!prompt.contains("delta"));
        let a = prompt.find("alpha").unwrap();
        let b = prompt.find("beta").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_truncates_long_passages() {
        let long = "x".repeat(450);
        let prompt = build_prompt("q", &[passage("a.pdf", &long, None, 0.5)]);
        assert!(prompt.contains(&format!("{}...", "x".repeat(400))));
        assert!(!prompt.contains(&"x".repeat(401)));
        assert!(prompt.contains("[a.pdf]\n"));
    }

    #[test]
    fn test_exact_length_passage_has_no_ellipsis() {
        let text = "y".repeat(400);
        assert_eq!(truncate_with_ellipsis(&text, 400), text);
    }

    #[test]
    fn test_template_shape() {
        let prompt = build_prompt("How long is the warranty?", &[]);
        assert!(prompt.starts_with("Answer the question using ONLY"));
        assert!(prompt.contains("QUESTION: How long is the warranty?"));
        assert!(prompt.ends_with("ANSWER:"));
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens("abcdefghi"), 2);
    }
}
