use std::ops::Range;

/// Index range of a 1-based `page` of `per_page` items within `total` items.
///
/// Out-of-range pages yield an empty range at the end of the list.
pub fn page_window(total: usize, page: u32, per_page: u32) -> Range<usize> {
    let per_page = per_page as usize;
    let start = (page.saturating_sub(1) as usize)
        .saturating_mul(per_page)
        .min(total);
    let end = start.saturating_add(per_page).min(total);
    start..end
}

/// Case-insensitive substring match; an empty query matches everything.
pub fn matches_query(name: &str, query: &str) -> bool {
    query.is_empty() || name.to_lowercase().contains(&query.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_window() {
        assert_eq!(page_window(250, 1, 100), 0..100);
        assert_eq!(page_window(250, 3, 100), 200..250);
        assert_eq!(page_window(250, 4, 100), 250..250);
        assert_eq!(page_window(5, 0, 2), 0..2);
        assert_eq!(page_window(5, 2, 0), 0..0);
    }

    #[test]
    fn test_matches_query() {
        assert!(matches_query("feature-abc-1", "ABC"));
        assert!(matches_query("anything", ""));
        assert!(!matches_query("main", "dev"));
    }
}
