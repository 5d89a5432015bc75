//! Page arithmetic for word listings.

use serde::Serialize;

/// One page of an ordered listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_count: usize,
    pub per_page: usize,
    pub total: usize,
}

/// Number of pages for `total` items. An empty listing still has one page.
pub fn page_count(total: usize, per_page: usize) -> usize {
    let per_page = per_page.max(1);
    total.div_ceil(per_page).max(1)
}

/// Clamp a 1-based page number into `[1, page_count]`.
pub fn clamp_page(page: usize, page_count: usize) -> usize {
    page.clamp(1, page_count.max(1))
}

/// Slice out one page, clamping `page` first so a page that no longer exists
/// (say, after deleting the last word on the last page) resolves to the
/// nearest page that does.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total = items.len();
    let page_count = page_count(total, per_page);
    let page = clamp_page(page, page_count);

    let start = (page - 1) * per_page;
    let items = items.into_iter().skip(start).take(per_page).collect();

    Page {
        items,
        page,
        page_count,
        per_page,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_matches_ceiling() {
        for per_page in 1..=20 {
            for total in 0..=65 {
                let expected = if total == 0 {
                    1
                } else {
                    (total + per_page - 1) / per_page
                };
                assert_eq!(page_count(total, per_page), expected, "n={} per={}", total, per_page);
            }
        }
    }

    #[test]
    fn test_last_page_is_never_empty() {
        for per_page in 1..=20 {
            for total in 1..=45usize {
                let words: Vec<usize> = (0..total).collect();
                let count = page_count(total, per_page);
                let last = paginate(words, count, per_page);
                let expected = total - (count - 1) * per_page;
                assert_eq!(last.items.len(), expected);
                assert!((1..=per_page).contains(&last.items.len()));
            }
        }
    }

    #[test]
    fn test_three_words_two_per_page() {
        let words = vec!["A", "B", "C"];
        let first = paginate(words.clone(), 1, 2);
        assert_eq!(first.items, vec!["A", "B"]);
        assert_eq!(first.page_count, 2);

        let second = paginate(words, 2, 2);
        assert_eq!(second.items, vec!["C"]);
        assert_eq!(second.page, 2);
    }

    #[test]
    fn test_out_of_range_page_clamps() {
        // One per page, page 3 of 3, then the word on page 3 is deleted.
        let page = paginate(vec!["A", "B"], 3, 1);
        assert_eq!(page.page_count, 2);
        assert_eq!(page.page, 2);
        assert_eq!(page.items, vec!["B"]);

        let zero = paginate(vec!["A", "B"], 0, 1);
        assert_eq!(zero.page, 1);
        assert_eq!(zero.items, vec!["A"]);
    }

    #[test]
    fn test_empty_listing() {
        let page = paginate(Vec::<u8>::new(), 4, 10);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_count, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
    }
}
