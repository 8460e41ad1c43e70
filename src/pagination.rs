//! Cursor handling for GitHub's `Link` header pagination.
//!
//! GitHub Link headers look like:
//! `<https://api.github.com/organizations/123/repos?per_page=100&page=2>; rel="next", <...&page=3>; rel="last"`

use crate::models::RateLimitState;

/// GitHub's maximum page size.
pub const MAX_PER_PAGE: u32 = 100;

pub fn clamp_per_page(per_page: u32) -> u32 {
    per_page.clamp(1, MAX_PER_PAGE)
}

/// Links extracted from a `Link` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub next: Option<String>,
    pub last: Option<String>,
}

impl PageLinks {
    /// Page number of the `rel="last"` link, when GitHub reports it.
    pub fn last_page(&self) -> Option<u32> {
        self.last.as_deref().and_then(page_number)
    }
}

pub fn parse_link_header(link_header: &str) -> PageLinks {
    let mut links = PageLinks::default();

    for part in link_header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(value) = segment.strip_prefix("rel=") {
                rel = Some(value.trim_matches('"'));
            }
        }

        if let (Some(url), Some(rel)) = (url, rel) {
            // A single link may carry several space-separated relations
            for rel_type in rel.split_whitespace() {
                match rel_type {
                    "next" => links.next = Some(url.to_string()),
                    "last" => links.last = Some(url.to_string()),
                    _ => {}
                }
            }
        }
    }

    links
}

fn page_number(url: &str) -> Option<u32> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Absolute URL of the next page; `None` on the last page.
    pub next: Option<String>,
    /// Page number of the last page, when the server reports it.
    pub last_page: Option<u32>,
    pub rate_limit: RateLimitState,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.next.is_none() || self.items.is_empty()
    }
}
