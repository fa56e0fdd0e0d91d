//! Expansion of user-supplied event id tokens.
//!
//! A token is `latest`, a bare id (`42`) or an inclusive range that may run
//! either way (`3-7`, `7-3`).

use crate::error::EventError;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

const LATEST: &str = "latest";

/// Largest number of ids a single range token may expand to.
pub const MAX_RANGE_LEN: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdToken {
    Latest,
    Id(i64),
    Range { from: i64, to: i64 },
}

impl fmt::Display for IdToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str(LATEST),
            Self::Id(id) => write!(f, "{id}"),
            Self::Range { from, to } => write!(f, "{from}-{to}"),
        }
    }
}

fn parse_id(value: &str, token: &str) -> Result<i64, EventError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EventError::invalid(format!("invalid id token: {token:?}")));
    }
    value
        .parse::<i64>()
        .map_err(|_| EventError::invalid(format!("id out of range: {token:?}")))
}

impl FromStr for IdToken {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token == LATEST {
            return Ok(Self::Latest);
        }
        match token.split_once('-') {
            Some((from, to)) => {
                let from = parse_id(from, token)?;
                let to = parse_id(to, token)?;
                if from.abs_diff(to) >= MAX_RANGE_LEN {
                    return Err(EventError::invalid(format!(
                        "range {token} expands to more than {MAX_RANGE_LEN} ids"
                    )));
                }
                Ok(Self::Range { from, to })
            }
            None => Ok(Self::Id(parse_id(token, token)?)),
        }
    }
}

/// Expanded, order-preserving token stream with ranges flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Latest,
    Id(i64),
}

/// What a `show`/`delete` request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSelection {
    /// The most recently inserted event, whatever its id.
    Latest,
    /// Distinct ids in first-seen order.
    Ids(Vec<i64>),
}

pub fn expand(tokens: &[IdToken]) -> Vec<Resolved> {
    let mut out = Vec::new();
    for token in tokens {
        match *token {
            IdToken::Latest => out.push(Resolved::Latest),
            IdToken::Id(id) => out.push(Resolved::Id(id)),
            IdToken::Range { from, to } if from <= to => {
                out.extend((from..=to).map(Resolved::Id));
            }
            IdToken::Range { from, to } => {
                out.extend((to..=from).rev().map(Resolved::Id));
            }
        }
    }
    out
}

/// Parses and resolves raw tokens.
///
/// A lone `latest` selects the newest event. `latest` next to numeric ids is
/// rejected, as is a list made only of repeated `latest` tokens.
pub fn resolve<S: AsRef<str>>(raw: &[S]) -> Result<IdSelection, EventError> {
    let tokens = raw
        .iter()
        .map(|token| token.as_ref().parse::<IdToken>())
        .collect::<Result<Vec<_>, _>>()?;
    let expanded = expand(&tokens);

    if expanded == [Resolved::Latest] {
        return Ok(IdSelection::Latest);
    }

    let has_latest = expanded.contains(&Resolved::Latest);
    let mut seen = HashSet::new();
    let ids: Vec<i64> = expanded
        .into_iter()
        .filter_map(|item| match item {
            Resolved::Id(id) => Some(id),
            Resolved::Latest => None,
        })
        .filter(|id| seen.insert(*id))
        .collect();

    if has_latest && ids.is_empty() {
        return Err(EventError::invalid("only 'latest' given"));
    }
    if has_latest {
        return Err(EventError::invalid("cannot mix 'latest' with numeric ids"));
    }
    Ok(IdSelection::Ids(ids))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<i64> {
        match resolve(raw).unwrap() {
            IdSelection::Ids(ids) => ids,
            IdSelection::Latest => panic!("expected numeric ids"),
        }
    }

    #[test]
    fn parses_tokens() {
        assert_eq!("latest".parse::<IdToken>().unwrap(), IdToken::Latest);
        assert_eq!(" 12 ".parse::<IdToken>().unwrap(), IdToken::Id(12));
        assert_eq!(
            "9-4".parse::<IdToken>().unwrap(),
            IdToken::Range { from: 9, to: 4 }
        );
    }

    #[test]
    fn rejects_malformed_tokens() {
        for bad in ["", "abc", "-3", "3-", "1-2-3", "a-b", "1.5", "+4", "LATEST"] {
            assert!(
                matches!(bad.parse::<IdToken>(), Err(EventError::InvalidArgument { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_oversized_ranges() {
        assert!("0-100000".parse::<IdToken>().is_err());
        assert!("0-99999".parse::<IdToken>().is_ok());
    }

    #[test]
    fn expands_ranges_both_ways() {
        assert_eq!(ids(&["1-4"]), vec![1, 2, 3, 4]);
        assert_eq!(ids(&["4-1"]), vec![4, 3, 2, 1]);
        assert_eq!(ids(&["5-5"]), vec![5]);
    }

    #[test]
    fn keeps_first_occurrence_order_without_duplicates() {
        assert_eq!(ids(&["7", "2-4", "3", "9-6", "7"]), vec![7, 2, 3, 4, 9, 8, 6]);
    }

    #[test]
    fn lone_latest_short_circuits() {
        assert_eq!(resolve(&["latest"]).unwrap(), IdSelection::Latest);
    }

    #[test]
    fn latest_mixed_with_ids_is_invalid() {
        let err = resolve(&["latest", "3"]).unwrap_err();
        assert!(err.to_string().contains("cannot mix"));
        assert!(resolve(&["1-2", "latest"]).is_err());
    }

    #[test]
    fn repeated_latest_only_is_invalid() {
        let err = resolve(&["latest", "latest"]).unwrap_err();
        assert!(err.to_string().contains("only 'latest'"));
    }

    #[test]
    fn one_bad_token_fails_the_whole_request() {
        assert!(resolve(&["1", "2", "x"]).is_err());
    }
}
