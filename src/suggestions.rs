//! # Error Suggestions
//!
//! This module provides helper functions for generating helpful error
//! messages with hints and suggestions. Errors should tell users what went
//! wrong AND how to fix it: an unknown service type is usually a typo, so
//! the registry attaches a "did you mean" hint plus the list of valid
//! choices instead of a bare lookup failure.

/// Build the hint for an unknown service type lookup.
///
/// Includes a "did you mean" suggestion when a registered type is close to
/// the requested one, and always lists the valid types.
pub fn unknown_service_hint(service_type: &str, valid_types: &[String]) -> Option<String> {
    build_hint(service_type, valid_types, "Valid service types are")
}

/// Build the hint for an unknown provider lookup.
pub fn unknown_provider_hint(provider: &str, valid_providers: &[String]) -> Option<String> {
    build_hint(provider, valid_providers, "Valid providers are")
}

fn build_hint(input: &str, candidates: &[String], listing_label: &str) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }

    let refs: Vec<&str> = candidates.iter().map(String::as_str).collect();
    let listing = format!("{listing_label}: {}", refs.join(", "));

    match find_similar(input, &refs) {
        Some(similar) => Some(format!("Did you mean '{similar}'? {listing}")),
        None => Some(listing),
    }
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Calculate the Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut matrix = vec![vec![0usize; b_len + 1]; a_len + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in matrix[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..=a_len {
        for j in 1..=b_len {
            let cost = if a_chars[i - 1] == b_chars[j - 1] {
                0
            } else {
                1
            };
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[a_len][b_len]
}
