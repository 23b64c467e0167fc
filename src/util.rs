pub fn normalize_query(raw: Option<&str>) -> Option<String> {
    let t = raw?.trim();
    if t.is_empty() {
        return None;
    }
    Some(t.to_lowercase())
}

// Version codes usually trail the human-readable version, e.g. "v27.1 (27100)".
pub fn parse_version_code(s: &str) -> Option<i64> {
    let mut best: Option<&str> = None;
    let mut start = None;
    for (i, c) in s.char_indices() {
        if c.is_ascii_digit() {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(b) = start.take() {
            best = Some(&s[b..i]);
        }
    }
    if let Some(b) = start {
        best = Some(&s[b..]);
    }
    best.and_then(|run| run.parse().ok())
}
