use std::cmp::Ordering;

use regex::Regex;

const TOKEN_PATTERN: &str = r"\d+|\D+";

/// One token of a file name, either a digit run or everything between
/// digit runs. Digit runs compare by numeric value at arbitrary precision,
/// leading zeros are trimmed and the remaining digits compare by length
/// first.
#[derive(Clone, Debug, PartialEq, Eq)]
enum NameToken {
    Number(String),
    Text(String),
}

impl Ord for NameToken {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (NameToken::Number(a), NameToken::Number(b)) => {
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (NameToken::Text(a), NameToken::Text(b)) => a.cmp(b),
            // digit runs sort before text, matching ascii order
            (NameToken::Number(_), NameToken::Text(_)) => Ordering::Less,
            (NameToken::Text(_), NameToken::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for NameToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn tokenize(name: &str, pattern: &Regex) -> Vec<NameToken> {
    pattern
        .find_iter(name)
        .map(|token| {
            let text = token.as_str();
            if text.chars().all(|c| c.is_ascii_digit()) {
                NameToken::Number(text.trim_start_matches('0').to_string())
            } else {
                NameToken::Text(text.to_string())
            }
        })
        .collect()
}

/// Compare two names in natural order, embedded digit runs by numeric
/// value.
///
/// # Examples
///
/// ```
/// # use rustcdf::convert::order::natural_cmp;
/// use std::cmp::Ordering;
/// assert_eq!(natural_cmp("scan2.cdf", "scan10.cdf"), Ordering::Less);
/// assert_eq!(natural_cmp("scan10.cdf", "scan10.cdf"), Ordering::Equal);
/// ```
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let pattern = Regex::new(TOKEN_PATTERN).unwrap();
    tokenize(a, &pattern)
        .cmp(&tokenize(b, &pattern))
        .then_with(|| a.cmp(b))
}

/// Sort names in place in natural order.
pub fn natural_sort(names: &mut [String]) {
    let pattern = Regex::new(TOKEN_PATTERN).unwrap();
    names.sort_by_cached_key(|name| (tokenize(name, &pattern), name.clone()));
}

/// Sorted copy of `names` in natural order.
pub fn natural_sorted(names: &[String]) -> Vec<String> {
    let mut sorted = names.to_vec();
    natural_sort(&mut sorted);
    sorted
}
