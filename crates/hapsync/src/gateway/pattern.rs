//! Glob-style matching for object id patterns.
//!
//! Ids are dot-separated paths. `*` matches any run of characters within a
//! single segment, so `shelly.0.*.Relay*` matches
//! `shelly.0.SHPLG-S#X#1.Relay0` but not ids with a different segment count.
//! A trailing bare `*` segment matches the whole remaining subtree, so
//! `rpi-io.0.*` covers `rpi-io.0.pin.flur`.

/// Whether `id` matches the glob `pattern`
pub fn matches(pattern: &str, id: &str) -> bool {
    let mut pattern_segments: Vec<&str> = pattern.split('.').collect();
    let id_segments: Vec<&str> = id.split('.').collect();

    let descend = pattern_segments.last() == Some(&"*");
    if descend {
        pattern_segments.pop();
        if id_segments.len() <= pattern_segments.len() {
            return false;
        }
    } else if pattern_segments.len() != id_segments.len() {
        return false;
    }

    pattern_segments
        .iter()
        .zip(id_segments.iter())
        .all(|(p, s)| segment_matches(p, s))
}

/// Match one segment against a segment pattern that may contain `*`
fn segment_matches(pattern: &str, segment: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == segment;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let mut rest = segment;

    // Anchored prefix
    let first = parts[0];
    if !rest.starts_with(first) {
        return false;
    }
    rest = &rest[first.len()..];

    // Anchored suffix
    let last = parts[parts.len() - 1];
    if parts.len() > 1 {
        if rest.len() < last.len() || !rest.ends_with(last) {
            return false;
        }
        rest = &rest[..rest.len() - last.len()];
    }

    // Middle parts must appear in order
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(index) => rest = &rest[index + part.len()..],
            None => return false,
        }
    }

    true
}
