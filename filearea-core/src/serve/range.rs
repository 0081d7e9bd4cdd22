/// Inclusive byte range already clamped to the content length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Never zero: `end` is inclusive.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Parse a `Range` request header. `None` means "serve the whole content": the unit
/// is not `bytes`, the content is empty, or any single range is malformed.
pub fn parse_range_header(value: &str, content_length: u64) -> Option<Vec<ByteRange>> {
    if content_length == 0 {
        return None;
    }
    let parts = value.trim().strip_prefix("bytes=")?;
    let last = content_length - 1;

    let mut out = Vec::new();
    for part in parts.split(',') {
        let (lo, hi) = part.trim().split_once('-')?;
        let (lo, hi) = (lo.trim(), hi.trim());
        let range = match (lo.is_empty(), hi.is_empty()) {
            (true, true) => return None,
            (true, false) => {
                let suffix: u64 = hi.parse().ok()?;
                ByteRange {
                    start: content_length.saturating_sub(suffix),
                    end: last,
                }
            }
            (false, _) => {
                let start: u64 = lo.parse().ok()?;
                let end = if hi.is_empty() {
                    last
                } else {
                    hi.parse::<u64>().ok()?.min(last)
                };
                ByteRange { start, end }
            }
        };
        if range.end < range.start {
            return None;
        }
        out.push(range);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(start: u64, end: u64) -> ByteRange {
        ByteRange { start, end }
    }

    #[test]
    fn normalizes_the_three_range_forms() {
        assert_eq!(parse_range_header("bytes=0-99", 1000), Some(vec![r(0, 99)]));
        assert_eq!(parse_range_header("bytes=900-", 1000), Some(vec![r(900, 999)]));
        assert_eq!(parse_range_header("bytes=-100", 1000), Some(vec![r(900, 999)]));
        assert_eq!(parse_range_header("bytes=990-5000", 1000), Some(vec![r(990, 999)]));
    }

    #[test]
    fn range_past_the_end_poisons_the_header() {
        assert_eq!(parse_range_header("bytes=2000-3000", 1000), None);
        assert_eq!(parse_range_header("bytes=0-10, 2000-3000", 1000), None);
        assert_eq!(parse_range_header("bytes=50-10", 1000), None);
    }

    #[test]
    fn keeps_submission_order_and_duplicates() {
        assert_eq!(
            parse_range_header("bytes= 500-599 , 0-9,0-9", 1000),
            Some(vec![r(500, 599), r(0, 9), r(0, 9)])
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_range_header("items=0-10", 1000), None);
        assert_eq!(parse_range_header("bytes=abc", 1000), None);
        assert_eq!(parse_range_header("bytes=-", 1000), None);
        assert_eq!(parse_range_header("bytes=1-x", 1000), None);
        assert_eq!(parse_range_header("bytes=0-0", 0), None);
    }

    #[test]
    fn oversized_suffix_covers_everything() {
        assert_eq!(parse_range_header("bytes=-5000", 1000), Some(vec![r(0, 999)]));
    }
}
