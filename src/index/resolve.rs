//! Fuzzy course-name resolution.
//!
//! Maps a partial or misspelled course name onto an exact catalog title.
//! Matching is tried in order: case-insensitive exact, substring, then
//! edit distance. Anything farther than the distance threshold fails closed.

/// Resolve `name` against the catalog `titles`.
///
/// Returns `None` when the name is blank or nothing is close enough.
pub fn resolve_course_name<S: AsRef<str>>(name: &str, titles: &[S]) -> Option<String> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let lowered: Vec<(String, &str)> = titles
        .iter()
        .map(|t| (t.as_ref().to_lowercase(), t.as_ref()))
        .collect();

    if let Some((_, title)) = lowered.iter().find(|(lower, _)| *lower == needle) {
        return Some(title.to_string());
    }

    let substring = lowered
        .iter()
        .filter(|(lower, _)| lower.contains(&needle) || needle.contains(lower.as_str()))
        .min_by(|(_, a), (_, b)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    if let Some((_, title)) = substring {
        return Some(title.to_string());
    }

    // Short names only match exactly or as a substring.
    let threshold = needle.chars().count() / 3;
    if threshold == 0 {
        return None;
    }
    lowered
        .iter()
        .map(|(lower, title)| (levenshtein(&needle, lower), *title))
        .filter(|(distance, _)| *distance <= threshold)
        .min_by(|(da, a), (db, b)| da.cmp(db).then_with(|| a.cmp(b)))
        .map(|(_, title)| title.to_string())
}

/// Edit distance between two strings, counted in characters.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &[&str] = &[
        "Building Towards Computer Use with Anthropic",
        "MCP: Build Rich-Context AI Apps with Anthropic",
        "Introduction to MCP",
        "Prompt Compression and Query Optimization",
    ];

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_exact_match_ignores_case() {
        assert_eq!(
            resolve_course_name("introduction to mcp", CATALOG).as_deref(),
            Some("Introduction to MCP")
        );
    }

    #[test]
    fn test_substring_prefers_shortest_title() {
        assert_eq!(
            resolve_course_name("MCP", CATALOG).as_deref(),
            Some("Introduction to MCP")
        );
        assert_eq!(
            resolve_course_name("computer use", CATALOG).as_deref(),
            Some("Building Towards Computer Use with Anthropic")
        );
    }

    #[test]
    fn test_typo_within_threshold() {
        assert_eq!(
            resolve_course_name("Introducton to MPC", CATALOG).as_deref(),
            Some("Introduction to MCP")
        );
    }

    #[test]
    fn test_unrelated_name_fails_closed() {
        assert!(resolve_course_name("Quantum Gardening", CATALOG).is_none());
        assert!(resolve_course_name("   ", CATALOG).is_none());
        assert!(resolve_course_name::<&str>("MCP", &[]).is_none());
    }

    #[test]
    fn test_short_names_need_a_close_match() {
        let catalog = ["Rust", "Go Concurrency", "Intro to C"];
        assert!(resolve_course_name("Ruby", &catalog).is_none());
        assert!(resolve_course_name("R", &["Go"]).is_none());
        assert_eq!(resolve_course_name("Rusty", &catalog).as_deref(), Some("Rust"));
        assert_eq!(resolve_course_name("go", &catalog).as_deref(), Some("Go Concurrency"));
    }
}
