/// Strips a surrounding markdown code fence (```json ... ```) if the model added one.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string, e.g. "json" or "csv"
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(strip_code_fence("  a,b,c\n"), "a,b,c");
    }

    #[test]
    fn removes_fence_and_language_tag() {
        let text = "```json\n{\"Total\": \"50\"}\n```";
        assert_eq!(strip_code_fence(text), "{\"Total\": \"50\"}");
    }

    #[test]
    fn tolerates_unterminated_fence() {
        assert_eq!(strip_code_fence("```\nE001,Ann"), "E001,Ann");
    }
}
