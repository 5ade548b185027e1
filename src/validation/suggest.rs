//! "Did you mean" suggestions for unknown names

/// Edit distance between two strings (insert, delete, substitute)
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0usize; b_chars.len() + 1];

    for (i, a_char) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != *b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

/// Closest candidate within `max_distance`, ties broken alphabetically
pub fn closest<'a>(
    name: &str,
    candidates: impl IntoIterator<Item = &'a str>,
    max_distance: usize,
) -> Option<String> {
    candidates
        .into_iter()
        .filter(|c| *c != name)
        .map(|c| (levenshtein_distance(name, c), c))
        .filter(|(distance, _)| *distance <= max_distance)
        .min()
        .map(|(_, c)| c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("title", "title"), 0);
    }

    #[test]
    fn test_closest() {
        let keywords = ["title", "type", "items", "description"];
        assert_eq!(closest("tittle", keywords, 2).as_deref(), Some("title"));
        assert_eq!(closest("descripton", keywords, 2).as_deref(), Some("description"));
        assert_eq!(closest("completely-different", keywords, 2), None);
    }
}
