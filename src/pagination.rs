//! Page arithmetic and the client-side filters applied to a fetched page.

use crate::models::{TranscriptionTask, User};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Number of pages for `total` items; an empty result still has one page.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 1;
    }
    let pages = total.div_ceil(page_size as u64);
    pages.max(1) as u32
}

/// The 1-based `page` of `items`. Out-of-range pages are empty.
pub fn paginate<T>(items: &[T], page: u32, page_size: u32) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page as usize - 1).saturating_mul(page_size as usize);
    if start >= items.len() {
        return &[];
    }
    let end = (start + page_size as usize).min(items.len());
    &items[start..end]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    page: u32,
    page_size: u32,
    total_pages: u32,
}

impl PageCursor {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            total_pages: 1,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Records the server's total and pulls the current page back into range.
    pub fn update_total(&mut self, total: u64) {
        self.total_pages = total_pages(total, self.page_size);
        self.page = self.page.clamp(1, self.total_pages);
    }

    pub fn go_to(&mut self, page: u32) {
        self.page = page.clamp(1, self.total_pages);
    }

    pub fn next(&mut self) -> bool {
        if self.page < self.total_pages {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            true
        } else {
            false
        }
    }
}

/// Footer line for a fetched page. The requested page is reported as given, so
/// a page past the end is never shown as the last one.
pub fn page_summary(requested: u32, page_size: u32, total: u64) -> String {
    let mut cursor = PageCursor::new(page_size);
    cursor.update_total(total);
    if requested == 0 || requested > cursor.total_pages() {
        return format!(
            "Page {} is out of range ({} pages, {} total)",
            requested,
            cursor.total_pages(),
            total
        );
    }

    cursor.go_to(requested);
    let mut summary = format!(
        "Page {} of {} ({} total)",
        cursor.page(),
        cursor.total_pages(),
        total
    );
    if cursor.next() {
        summary.push_str(&format!(", next: --page {}", cursor.page()));
    }
    summary
}

pub fn filter_tasks_by_filename<'a>(
    tasks: &'a [TranscriptionTask],
    search: &str,
) -> Vec<&'a TranscriptionTask> {
    let needle = search.to_lowercase();
    tasks
        .iter()
        .filter(|task| task.original_filename.to_lowercase().contains(&needle))
        .collect()
}

/// Matches the username or email, case-insensitively.
pub fn filter_users<'a>(users: &'a [User], search: &str) -> Vec<&'a User> {
    let needle = search.to_lowercase();
    users
        .iter()
        .filter(|user| {
            user.username.to_lowercase().contains(&needle)
                || user
                    .email
                    .as_ref()
                    .map(|email| email.to_lowercase().contains(&needle))
                    .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(45, 20), 3);
        assert_eq!(total_pages(40, 20), 2);
        assert_eq!(total_pages(0, 20), 1);
        assert_eq!(total_pages(5, 0), 1);
    }

    #[test]
    fn test_paginate_second_page() {
        let items: Vec<u32> = (1..=45).collect();
        let page = paginate(&items, 2, 20);
        assert_eq!(page.len(), 20);
        assert_eq!(page[0], 21);
        assert_eq!(paginate(&items, 3, 20).len(), 5);
        assert!(paginate(&items, 4, 20).is_empty());
        assert!(paginate(&items, 0, 20).is_empty());
    }

    #[test]
    fn test_cursor_clamps() {
        let mut cursor = PageCursor::new(20);
        cursor.update_total(45);
        assert_eq!(cursor.total_pages(), 3);
        cursor.go_to(9);
        assert_eq!(cursor.page(), 3);
        assert!(!cursor.next());
        assert!(cursor.prev());
        cursor.update_total(10);
        assert_eq!(cursor.page(), 1);
        assert!(!cursor.prev());
    }

    #[test]
    fn test_page_summary() {
        assert_eq!(page_summary(2, 20, 45), "Page 2 of 3 (45 total), next: --page 3");
        assert_eq!(page_summary(3, 20, 45), "Page 3 of 3 (45 total)");
        assert_eq!(page_summary(9, 20, 45), "Page 9 is out of range (3 pages, 45 total)");
        assert_eq!(page_summary(1, 20, 0), "Page 1 of 1 (0 total)");
    }

    #[test]
    fn test_filter_users_by_name_or_email() {
        let users = vec![
            User {
                id: 1,
                username: "Alice".to_string(),
                ..Default::default()
            },
            User {
                id: 2,
                username: "bob".to_string(),
                email: Some("bob@ALICE.dev".to_string()),
                ..Default::default()
            },
            User {
                id: 3,
                username: "carol".to_string(),
                ..Default::default()
            },
        ];
        let found: Vec<i64> = filter_users(&users, "alice").iter().map(|u| u.id).collect();
        assert_eq!(found, vec![1, 2]);
        assert_eq!(filter_users(&users, "").len(), 3);
    }
}
