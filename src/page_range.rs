use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub first: u32, // 1-based inclusive
    pub last: u32,  // 1-based inclusive
}

impl PageRange {
    /// Parses `"N"` or `"N-M"`. Zero pages and reversed ranges are rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (first, last) = match raw.split_once('-') {
            Some((a, b)) => (parse_page(a, raw)?, parse_page(b, raw)?),
            None => {
                let p = parse_page(raw, raw)?;
                (p, p)
            }
        };
        if first > last {
            return Err(anyhow!(
                "invalid page range: {raw} (first page {first} is after last page {last})"
            ));
        }
        Ok(Self { first, last })
    }

    pub fn all(page_count: u32) -> Self {
        Self {
            first: 1,
            last: page_count.max(1),
        }
    }

    pub fn len(&self) -> u32 {
        self.last - self.first + 1
    }

    pub fn pages(&self) -> std::ops::RangeInclusive<u32> {
        self.first..=self.last
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == self.last {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{}-{}", self.first, self.last)
        }
    }
}

fn parse_page(part: &str, raw: &str) -> Result<u32> {
    let part = part.trim();
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(anyhow!("invalid page range: {raw} (use format like: 1-5 or 3)"));
    }
    let page: u32 = part
        .parse()
        .map_err(|_| anyhow!("invalid page range: {raw} (page number out of range)"))?;
    if page == 0 {
        return Err(anyhow!("invalid page range: {raw} (pages are numbered from 1)"));
    }
    Ok(page)
}
