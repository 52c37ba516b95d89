use serde::Serialize;

use crate::database::Page;

/// Page metadata attached to every list response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub count: i64,
    pub pages: i64,
    pub page_size: i64,
    pub current_page: i64,
    pub next_page: i64,
    pub previous_page: i64,
}

impl Pagination {
    /// Envelope for `count` rows viewed `page_size` at a time, with `page` clamped into range
    pub fn new(count: i64, page: i64, page_size: i64) -> Self {
        let page_size = page_size.max(1);
        let pages = if count > 0 {
            (count - 1) / page_size + 1
        } else {
            1
        };
        let current_page = page.clamp(1, pages);

        Self {
            count,
            pages,
            page_size,
            current_page,
            next_page: current_page.saturating_add(1).min(pages),
            previous_page: (current_page - 1).max(1),
        }
    }

    /// Limit/offset for the clamped current page
    pub fn window(&self) -> Page {
        Page {
            limit: self.page_size,
            offset: (self.current_page - 1).saturating_mul(self.page_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_five_rows_in_pages_of_ten() {
        let p = Pagination::new(25, 1, 10);
        assert_eq!(
            p,
            Pagination {
                count: 25,
                pages: 3,
                page_size: 10,
                current_page: 1,
                next_page: 2,
                previous_page: 1,
            }
        );
        assert_eq!(p.window(), Page { limit: 10, offset: 0 });
    }

    #[test]
    fn empty_result_still_has_one_page() {
        let p = Pagination::new(0, 4, 10);
        assert_eq!(p.pages, 1);
        assert_eq!(p.current_page, 1);
        assert_eq!(p.next_page, 1);
        assert_eq!(p.previous_page, 1);
    }

    #[test]
    fn page_past_the_end_is_clamped() {
        let p = Pagination::new(25, 9, 10);
        assert_eq!(p.current_page, 3);
        assert_eq!(p.next_page, 3);
        assert_eq!(p.previous_page, 2);
        assert_eq!(p.window().offset, 20);
    }

    #[test]
    fn envelope_bounds_hold_across_inputs() {
        for count in 0..60 {
            for page_size in 1..12 {
                for page in -1..10 {
                    let p = Pagination::new(count, page, page_size);
                    let expected_pages = if count > 0 {
                        (count as f64 / page_size as f64).ceil() as i64
                    } else {
                        1
                    };
                    assert_eq!(p.pages, expected_pages);
                    assert!(1 <= p.current_page && p.current_page <= p.pages);
                    assert!(1 <= p.previous_page && p.previous_page <= p.current_page);
                    assert!(p.current_page <= p.next_page && p.next_page <= p.pages);
                }
            }
        }

        for count in [0, 1, 2, 1_000, i64::MAX] {
            for page in [1, 2, i64::MAX] {
                let p = Pagination::new(count, page, i64::MAX);
                assert_eq!(p.pages, 1);
                assert_eq!(p.current_page, 1);
                assert_eq!(p.window(), Page { limit: i64::MAX, offset: 0 });
            }
        }
    }

    #[test]
    fn huge_row_count_does_not_overflow() {
        let p = Pagination::new(i64::MAX, i64::MAX, 2);
        assert_eq!(p.pages, i64::MAX / 2 + 1);
        assert_eq!(p.current_page, p.pages);
        assert_eq!(p.next_page, p.pages);
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(Pagination::new(3, 1, 10)).unwrap();
        assert_eq!(value["pageSize"], 10);
        assert_eq!(value["currentPage"], 1);
        assert_eq!(value["previousPage"], 1);
    }
}
