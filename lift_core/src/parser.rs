//! Free-text set entry parsing.
//!
//! An entry line looks like `bench press: 135x5, 155x3`. The exercise name is
//! normalized; every comma-separated token must be `<weight>x<reps>`.

use crate::{Error, ParsedSet, Result};

/// A validated entry line
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedEntry {
    pub exercise: String,
    pub sets: Vec<ParsedSet>,
}

/// Normalize a user-typed name: trim, lower-case, collapse inner whitespace.
///
/// Used for exercise names and usernames alike; this is the only form that
/// gets persisted or compared.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse an entry line into an exercise name and its sets
pub fn parse_entry(raw: &str) -> Result<ParsedEntry> {
    let (name, list) = raw
        .split_once(':')
        .ok_or_else(|| Error::MalformedEntry("expected ':' after exercise name".into()))?;

    let exercise = normalize_name(name);
    if exercise.is_empty() {
        return Err(Error::MalformedEntry("exercise name is missing".into()));
    }

    let tokens: Vec<&str> = list
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return Err(Error::MalformedEntry(format!(
            "no sets provided for '{}'",
            exercise
        )));
    }

    let sets = tokens
        .into_iter()
        .map(parse_set_token)
        .collect::<Result<Vec<_>>>()?;

    Ok(ParsedEntry { exercise, sets })
}

/// Parse a single `<weight>x<reps>` token
pub fn parse_set_token(token: &str) -> Result<ParsedSet> {
    let token = token.trim();
    let parts: Vec<&str> = token.split(['x', 'X']).collect();
    if parts.len() != 2 {
        return Err(Error::invalid_token(token, "expected <weight>x<reps>"));
    }

    let weight: f64 = parts[0]
        .trim()
        .parse()
        .map_err(|_| Error::invalid_token(token, "weight is not a number"))?;
    let reps: i64 = parts[1]
        .trim()
        .parse()
        .map_err(|_| Error::invalid_token(token, "reps is not a whole number"))?;

    if !weight.is_finite() || weight < 0.0 {
        return Err(Error::invalid_token(token, "weight must be zero or more"));
    }
    if reps <= 0 {
        return Err(Error::invalid_token(token, "reps must be positive"));
    }
    let reps = u32::try_from(reps).map_err(|_| Error::invalid_token(token, "reps is too large"))?;

    Ok(ParsedSet { weight, reps })
}
