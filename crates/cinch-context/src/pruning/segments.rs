//! Head / tail extraction over a virtually joined list of text segments.
//!
//! A tool result can carry several text blocks. For trimming they are
//! treated as one string joined by single `\n` separators, but very large
//! outputs are never actually joined: both scans walk the segment list
//! with a running budget and copy only the characters they keep.

/// Separator placed between segments of the virtual string.
pub const SEGMENT_SEPARATOR: char = '\n';

/// Length in chars of `parts` joined by [`SEGMENT_SEPARATOR`].
pub fn joined_len(parts: &[&str]) -> usize {
    let text: usize = parts.iter().map(|p| p.chars().count()).sum();
    text + parts.len().saturating_sub(1)
}

/// The first `max_chars` chars of the virtual string.
pub fn take_head(parts: &[&str], max_chars: usize) -> String {
    let mut out = String::new();
    let mut remaining = max_chars;
    for (i, part) in parts.iter().enumerate() {
        if remaining == 0 {
            break;
        }
        if i > 0 {
            out.push(SEGMENT_SEPARATOR);
            remaining -= 1;
            if remaining == 0 {
                break;
            }
        }
        let len = part.chars().count();
        if len <= remaining {
            out.push_str(part);
            remaining -= len;
        } else {
            out.extend(part.chars().take(remaining));
            remaining = 0;
        }
    }
    out
}

/// The last `max_chars` chars of the virtual string.
pub fn take_tail(parts: &[&str], max_chars: usize) -> String {
    // Collected back to front, reversed once at the end.
    let mut pieces: Vec<String> = Vec::new();
    let mut remaining = max_chars;
    for (i, part) in parts.iter().rev().enumerate() {
        if remaining == 0 {
            break;
        }
        if i > 0 {
            pieces.push(SEGMENT_SEPARATOR.to_string());
            remaining -= 1;
            if remaining == 0 {
                break;
            }
        }
        let len = part.chars().count();
        if len <= remaining {
            pieces.push((*part).to_string());
            remaining -= len;
        } else {
            pieces.push(part.chars().skip(len - remaining).collect());
            remaining = 0;
        }
    }
    pieces.reverse();
    pieces.concat()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(parts: &[&str]) -> Vec<char> {
        parts.join("\n").chars().collect()
    }

    fn reference_head(parts: &[&str], n: usize) -> String {
        joined(parts).into_iter().take(n).collect()
    }

    fn reference_tail(parts: &[&str], n: usize) -> String {
        let chars = joined(parts);
        let skip = chars.len().saturating_sub(n);
        chars.into_iter().skip(skip).collect()
    }

    #[test]
    fn joined_len_counts_separators() {
        assert_eq!(joined_len(&[]), 0);
        assert_eq!(joined_len(&["abc"]), 3);
        assert_eq!(joined_len(&["abc", "de", ""]), 3 + 2 + 0 + 2);
    }

    #[test]
    fn head_and_tail_match_join_for_every_cut() {
        let cases: [&[&str]; 4] = [
            &["hello"],
            &["ab", "cd", "ef"],
            &["", "x", "", "yz"],
            &["héllo", "wörld", "ß"],
        ];
        for parts in cases {
            let total = joined_len(parts);
            for n in 0..=total + 2 {
                assert_eq!(take_head(parts, n), reference_head(parts, n), "head {parts:?} {n}");
                assert_eq!(take_tail(parts, n), reference_tail(parts, n), "tail {parts:?} {n}");
            }
        }
    }

    #[test]
    fn head_spans_blocks() {
        assert_eq!(take_head(&["abc", "def"], 5), "abc\nd");
    }

    #[test]
    fn tail_spans_blocks() {
        assert_eq!(take_tail(&["abc", "def"], 5), "c\ndef");
    }

    #[test]
    fn empty_parts() {
        assert_eq!(take_head(&[], 10), "");
        assert_eq!(take_tail(&[], 10), "");
    }
}
