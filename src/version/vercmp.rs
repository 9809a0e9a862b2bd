// src/version/vercmp.rs

//! Segmented version string comparison
//!
//! Both strings are walked in lockstep and split into maximal runs of
//! digits or letters. Everything else is a separator and only delimits
//! runs, with two exceptions:
//!
//! - `~` sorts before anything, even the end of the string (`1.0~rc1 < 1.0`)
//! - `^` sorts after the end of the string but before any other run
//!   (`1.0 < 1.0^git1 < 1.0.1`)

use std::cmp::Ordering;

fn is_separator(b: u8) -> bool {
    !b.is_ascii_alphanumeric() && b != b'~' && b != b'^'
}

/// Compare two version (or release) strings segment by segment
pub fn vercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let one = a.as_bytes();
    let two = b.as_bytes();
    let mut i = 0;
    let mut j = 0;

    while i < one.len() || j < two.len() {
        while i < one.len() && is_separator(one[i]) {
            i += 1;
        }
        while j < two.len() && is_separator(two[j]) {
            j += 1;
        }

        let c1 = one.get(i).copied();
        let c2 = two.get(j).copied();

        if c1 == Some(b'~') || c2 == Some(b'~') {
            if c1 != Some(b'~') {
                return Ordering::Greater;
            }
            if c2 != Some(b'~') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        if c1 == Some(b'^') || c2 == Some(b'^') {
            if c1.is_none() {
                return Ordering::Less;
            }
            if c2.is_none() {
                return Ordering::Greater;
            }
            if c1 != Some(b'^') {
                return Ordering::Greater;
            }
            if c2 != Some(b'^') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        if c1.is_none() || c2.is_none() {
            break;
        }

        let start1 = i;
        let start2 = j;
        let numeric = one[i].is_ascii_digit();

        if numeric {
            while i < one.len() && one[i].is_ascii_digit() {
                i += 1;
            }
            while j < two.len() && two[j].is_ascii_digit() {
                j += 1;
            }
        } else {
            while i < one.len() && one[i].is_ascii_alphabetic() {
                i += 1;
            }
            while j < two.len() && two[j].is_ascii_alphabetic() {
                j += 1;
            }
        }

        let seg1 = &one[start1..i];
        let seg2 = &two[start2..j];

        // Mixed segment types: numbers are newer than letters
        if seg2.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ordering = if numeric {
            compare_numeric(seg1, seg2)
        } else {
            seg1.cmp(seg2)
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    match (i >= one.len(), j >= two.len()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        _ => Ordering::Greater,
    }
}

/// Compare two digit runs by numeric value without overflow
fn compare_numeric(a: &[u8], b: &[u8]) -> Ordering {
    let a = strip_leading_zeros(a);
    let b = strip_leading_zeros(b);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn strip_leading_zeros(s: &[u8]) -> &[u8] {
    let zeros = s.iter().take_while(|&&c| c == b'0').count();
    &s[zeros..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering::{Equal, Greater, Less};

    #[test]
    fn test_equal_strings() {
        assert_eq!(vercmp("1.0", "1.0"), Equal);
        assert_eq!(vercmp("", ""), Equal);
    }

    #[test]
    fn test_numeric_segments() {
        assert_eq!(vercmp("1.0", "2.0"), Less);
        assert_eq!(vercmp("2.0.1", "2.0"), Greater);
        assert_eq!(vercmp("1.10", "1.9"), Greater);
        assert_eq!(vercmp("1.010", "1.10"), Equal);
        assert_eq!(vercmp("1.001", "1.1"), Equal);
    }

    #[test]
    fn test_huge_numbers_do_not_overflow() {
        assert_eq!(
            vercmp("123456789012345678901234567890", "123456789012345678901234567891"),
            Less
        );
    }

    #[test]
    fn test_alpha_segments() {
        assert_eq!(vercmp("1.0a", "1.0b"), Less);
        assert_eq!(vercmp("abc", "abd"), Less);
        assert_eq!(vercmp("FC5", "fc4"), Less);
    }

    #[test]
    fn test_trailing_alpha_run_is_newer() {
        assert_eq!(vercmp("1.0a", "1.0"), Greater);
        assert_eq!(vercmp("1.0", "1.0a"), Less);
    }

    #[test]
    fn test_numeric_beats_alpha() {
        assert_eq!(vercmp("1.1", "1.a"), Greater);
        assert_eq!(vercmp("1.a", "1.1"), Less);
    }

    #[test]
    fn test_separators_only_delimit() {
        assert_eq!(vercmp("1.0", "1_0"), Equal);
        assert_eq!(vercmp("1.0", "1+0"), Equal);
        assert_eq!(vercmp("1..0", "1.0"), Equal);
        assert_eq!(vercmp("1.0.", "1.0"), Equal);
    }

    #[test]
    fn test_tilde_sorts_first() {
        assert_eq!(vercmp("1.0~rc1", "1.0"), Less);
        assert_eq!(vercmp("1.0~rc1", "1.0~rc2"), Less);
        assert_eq!(vercmp("1.0~~", "1.0~"), Less);
        assert_eq!(vercmp("1.0", "1.0~rc1"), Greater);
    }

    #[test]
    fn test_caret_sorts_after_end() {
        assert_eq!(vercmp("1.0^git1", "1.0"), Greater);
        assert_eq!(vercmp("1.0^git1", "1.0.1"), Less);
        assert_eq!(vercmp("1.0^git1", "1.0^git2"), Less);
        assert_eq!(vercmp("1.0^", "1.0"), Greater);
        assert_eq!(vercmp("1.0~rc1^git1", "1.0~rc1"), Greater);
    }
}
