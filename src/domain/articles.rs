//! Pure helpers shared by article write paths.

const EXCERPT_MAX_CHARS: usize = 160;

/// Number of whitespace-separated words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Builds an excerpt from the article body, cut on a word boundary.
///
/// Bodies shorter than the limit are returned with whitespace collapsed;
/// longer ones get a trailing ellipsis.
pub fn derive_excerpt(body: &str) -> String {
    let mut excerpt = String::new();
    let mut truncated = false;

    for word in body.split_whitespace() {
        let needed = if excerpt.is_empty() {
            word.chars().count()
        } else {
            word.chars().count() + 1
        };
        if excerpt.chars().count() + needed > EXCERPT_MAX_CHARS {
            truncated = true;
            break;
        }
        if !excerpt.is_empty() {
            excerpt.push(' ');
        }
        excerpt.push_str(word);
    }

    if truncated {
        if excerpt.is_empty() {
            // a single word longer than the limit
            excerpt = body.trim().chars().take(EXCERPT_MAX_CHARS).collect();
        }
        excerpt.push('…');
    }

    excerpt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_across_whitespace() {
        assert_eq!(word_count("  one two\nthree\tfour "), 4);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn short_body_is_kept_whole() {
        assert_eq!(derive_excerpt("A  short\nbody"), "A short body");
    }

    #[test]
    fn long_body_is_cut_on_word_boundary() {
        let body = "word ".repeat(100);
        let excerpt = derive_excerpt(&body);
        assert!(excerpt.ends_with('…'));
        assert!(excerpt.chars().count() <= EXCERPT_MAX_CHARS + 1);
        assert!(!excerpt.trim_end_matches('…').ends_with(' '));
    }

    #[test]
    fn oversized_single_word_is_clipped() {
        let body = "x".repeat(400);
        let excerpt = derive_excerpt(&body);
        assert_eq!(excerpt.chars().count(), EXCERPT_MAX_CHARS + 1);
    }
}
