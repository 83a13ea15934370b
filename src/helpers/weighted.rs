//! Weighted-choice parsing for `/status` (`spec.md` §4.D).
//!
//! Accepts `"200:0.5,404:0.3,500"` -- a comma-separated list of
//! `value[:weight]` pairs where an omitted weight defaults to `1.0`. Parse
//! errors surface at configuration time rather than at request time, per
//! the design notes, since a malformed weight list is an operator mistake
//! that should fail the request that set it up, not silently degrade.

use crate::error::Error;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct WeightedChoices<T> {
    entries: Vec<(T, f64)>,
    total: f64,
}

impl<T: Clone> WeightedChoices<T> {
    pub fn pick(&self) -> &T {
        let mut target = rand::thread_rng().gen_range(0.0..self.total);
        for (value, weight) in &self.entries {
            if target < *weight {
                return value;
            }
            target -= weight;
        }
        &self.entries.last().expect("non-empty by construction").0
    }
}

/// Parses a weighted status-code list such as `"200:0.5,404:0.3,500"`.
pub fn parse_weighted_codes(input: &str) -> Result<WeightedChoices<u16>, Error> {
    let mut entries = Vec::new();
    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (value_str, weight) = match part.split_once(':') {
            Some((v, w)) => (
                v,
                w.trim()
                    .parse::<f64>()
                    .map_err(|_| Error::BadRequest(format!("invalid weight in {part:?}")))?,
            ),
            None => (part, 1.0),
        };
        let code: u16 = value_str
            .trim()
            .parse()
            .map_err(|_| Error::BadRequest(format!("invalid status code in {part:?}")))?;
        if weight <= 0.0 {
            return Err(Error::BadRequest(format!("weight must be positive in {part:?}")));
        }
        entries.push((code, weight));
    }

    if entries.is_empty() {
        return Err(Error::BadRequest("empty weighted status list".into()));
    }

    let total = entries.iter().map(|(_, w)| w).sum();
    Ok(WeightedChoices { entries, total })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_explicit_and_default_weights() {
        let choices = parse_weighted_codes("200:0.5,404:0.3,500").unwrap();
        assert_eq!(choices.entries.len(), 3);
        assert_eq!(choices.entries[2], (500, 1.0));
        assert!((choices.total - 1.8).abs() < 1e-9);
    }

    #[test]
    fn rejects_zero_or_negative_weight() {
        assert!(parse_weighted_codes("200:0").is_err());
        assert!(parse_weighted_codes("200:-1").is_err());
    }

    #[test]
    fn rejects_empty_list() {
        assert!(parse_weighted_codes("").is_err());
    }

    #[test]
    fn pick_always_returns_a_listed_code() {
        let choices = parse_weighted_codes("200:1,404:1").unwrap();
        for _ in 0..50 {
            let code = *choices.pick();
            assert!(code == 200 || code == 404);
        }
    }
}
