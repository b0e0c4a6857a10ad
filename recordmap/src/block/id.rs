/// Block ids appear both dashed (uuid form) and compact (32 hex digits).
/// Compact, lowercased form used for comparisons and page URLs.
pub fn compact_id(id: &str) -> String {
    id.chars()
        .filter(|c| *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// True when both ids name the same block regardless of dashes or case.
pub fn ids_match(a: &str, b: &str) -> bool {
    compact_id(a) == compact_id(b)
}

/// Extract a block id from a bare id, a dashed uuid, or a page URL/slug
/// ending in one (`https://www.notion.so/My-Page-0123...cdef?pvs=4`).
pub fn parse_block_id(input: &str) -> Option<String> {
    let path = input.split(['?', '#']).next().unwrap_or(input);
    let tail = path.rsplit('/').next().unwrap_or(path);
    let hex: Vec<char> = tail.chars().filter(|c| *c != '-').collect();
    if hex.len() < 32 {
        return None;
    }
    let candidate = &hex[hex.len() - 32..];
    if candidate.iter().all(char::is_ascii_hexdigit) {
        Some(candidate.iter().flat_map(|c| c.to_lowercase()).collect())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPACT: &str = "067dd719a912471ea9a3ac10710e7fdf";

    #[test]
    fn compacts_dashed_uuid() {
        assert_eq!(compact_id("067DD719-a912-471e-a9a3-ac10710e7fdf"), COMPACT);
        assert!(ids_match("067dd719-a912-471e-a9a3-ac10710e7fdf", COMPACT));
    }

    #[test]
    fn parses_ids_from_urls() {
        assert_eq!(
            parse_block_id(&format!("https://www.notion.so/Some-Page-{COMPACT}?pvs=4")),
            Some(COMPACT.to_string())
        );
        assert_eq!(
            parse_block_id("067dd719-a912-471e-a9a3-ac10710e7fdf"),
            Some(COMPACT.to_string())
        );
        assert_eq!(parse_block_id("not-an-id"), None);
    }
}
