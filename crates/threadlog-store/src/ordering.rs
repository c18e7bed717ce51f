//! Pagination bounds, sort order and per-thread index assignment.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schema::ValidationError;

pub const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ValidationError::new("order", "must be 'asc' or 'desc'")),
        }
    }
}

/// Limits and defaults for one kind of listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    pub default_limit: u32,
    pub max_limit: u32,
    pub default_order: SortOrder,
}

pub const THREAD_PAGE: PageBounds = PageBounds {
    default_limit: 20,
    max_limit: 100,
    default_order: SortOrder::Desc,
};

pub const MESSAGE_PAGE: PageBounds = PageBounds {
    default_limit: 50,
    max_limit: 200,
    default_order: SortOrder::Asc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
    pub order: SortOrder,
}

impl Page {
    pub fn first(bounds: PageBounds) -> Self {
        Self {
            limit: bounds.default_limit,
            offset: 0,
            order: bounds.default_order,
        }
    }

    /// Build a page from raw query-string values, applying defaults for
    /// absent values and rejecting anything outside `bounds`.
    pub fn parse(
        bounds: PageBounds,
        limit: Option<&str>,
        offset: Option<&str>,
        order: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let limit = match limit {
            Some(raw) => {
                let value: i64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ValidationError::new("limit", "must be an integer"))?;
                if value < 1 || value > i64::from(bounds.max_limit) {
                    return Err(ValidationError::new(
                        "limit",
                        format!("must be between 1 and {}", bounds.max_limit),
                    ));
                }
                value as u32
            }
            None => bounds.default_limit,
        };

        let offset = match offset {
            Some(raw) => {
                let value: i64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ValidationError::new("offset", "must be an integer"))?;
                u32::try_from(value)
                    .map_err(|_| ValidationError::new("offset", "must be zero or greater"))?
            }
            None => 0,
        };

        let order = match order {
            Some(raw) => raw.parse()?,
            None => bounds.default_order,
        };

        Ok(Self { limit, offset, order })
    }

    /// Apply this page to an already sorted-ascending sequence.
    pub fn slice<T>(&self, mut items: Vec<T>) -> Vec<T> {
        if self.order == SortOrder::Desc {
            items.reverse();
        }
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

/// Indices for `count` new messages given the thread's current maximum.
pub fn next_indices(current_max: Option<i64>, count: usize) -> Range<i64> {
    let start = current_max.map_or(0, |max| max + 1);
    start..start + count as i64
}

/// First characters of a message for thread listings.
pub fn preview(content: &str) -> Option<String> {
    if content.is_empty() {
        return None;
    }
    Some(content.chars().take(PREVIEW_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let page = Page::parse(THREAD_PAGE, None, None, None).unwrap();
        assert_eq!(page, Page { limit: 20, offset: 0, order: SortOrder::Desc });

        let page = Page::parse(MESSAGE_PAGE, None, None, None).unwrap();
        assert_eq!(page, Page { limit: 50, offset: 0, order: SortOrder::Asc });
    }

    #[test]
    fn test_page_bounds_are_enforced() {
        assert!(Page::parse(THREAD_PAGE, Some("0"), None, None).is_err());
        assert!(Page::parse(THREAD_PAGE, Some("101"), None, None).is_err());
        assert!(Page::parse(THREAD_PAGE, Some("100"), None, None).is_ok());
        assert!(Page::parse(MESSAGE_PAGE, Some("200"), None, None).is_ok());
        assert!(Page::parse(MESSAGE_PAGE, Some("201"), None, None).is_err());
        assert!(Page::parse(MESSAGE_PAGE, None, Some("-1"), None).is_err());
        assert!(Page::parse(MESSAGE_PAGE, Some("ten"), None, None).is_err());
        assert!(Page::parse(MESSAGE_PAGE, None, None, Some("sideways")).is_err());
    }

    #[test]
    fn test_order_is_case_insensitive() {
        let page = Page::parse(THREAD_PAGE, None, None, Some("ASC")).unwrap();
        assert_eq!(page.order, SortOrder::Asc);
    }

    #[test]
    fn test_slice_applies_order_then_window() {
        let page = Page { limit: 2, offset: 1, order: SortOrder::Desc };
        assert_eq!(page.slice(vec![0, 1, 2, 3, 4]), vec![3, 2]);

        let page = Page { limit: 10, offset: 3, order: SortOrder::Asc };
        assert_eq!(page.slice(vec![0, 1, 2, 3, 4]), vec![3, 4]);
    }

    #[test]
    fn test_next_indices() {
        assert_eq!(next_indices(None, 3), 0..3);
        assert_eq!(next_indices(Some(2), 2), 3..5);
        assert!(next_indices(Some(7), 0).is_empty());
    }

    #[test]
    fn test_preview_counts_characters() {
        assert_eq!(preview(""), None);
        assert_eq!(preview("short").as_deref(), Some("short"));

        let long = "é".repeat(80);
        let cut = preview(&long).unwrap();
        assert_eq!(cut.chars().count(), PREVIEW_CHARS);
    }
}
