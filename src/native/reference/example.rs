//! Text example parser for the reference engine.
//!
//! Format: `[label [importance [initial]]] ['tag] | [namespace] feature[:value] ...`
//! with any number of `|`-separated namespaces. A namespace name is the
//! token glued to its `|`; features without a value count as `1.0`.

use crate::error::{NativeError, NativeResult};

/// Key of the bias feature present in every example.
pub const CONSTANT: &str = "constant";

/// One parsed example.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub label: Option<f32>,
    pub importance: f32,
    /// Offset added to the raw score before the link function.
    pub initial: f32,
    pub tag: Option<String>,
    /// `(key, value)` pairs in input order; keys are `namespace^name`.
    pub features: Vec<(String, f32)>,
}

fn malformed(what: &str, token: &str) -> NativeError {
    NativeError::new(format!("malformed {what} '{token}'"))
}

pub fn parse(line: &str) -> NativeResult<Example> {
    let (head, body) = line.split_once('|').unwrap_or((line, ""));

    let mut numbers = Vec::with_capacity(3);
    let mut tag = None;
    for token in head.split_whitespace() {
        if let Some(t) = token.strip_prefix('\'') {
            tag = Some(t.to_string());
            continue;
        }
        if numbers.len() == 3 {
            return Err(malformed("label section", head.trim()));
        }
        let n = token
            .parse::<f32>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| malformed("label", token))?;
        numbers.push(n);
    }

    let importance = numbers.get(1).copied().unwrap_or(1.0);
    if importance < 0.0 {
        return Err(malformed("importance weight", &importance.to_string()));
    }

    let mut features = Vec::new();
    if line.contains('|') {
        for segment in body.split('|') {
            parse_namespace(segment, &mut features)?;
        }
    }

    Ok(Example {
        label: numbers.first().copied(),
        importance,
        initial: numbers.get(2).copied().unwrap_or(0.0),
        tag,
        features,
    })
}

fn parse_namespace(segment: &str, out: &mut Vec<(String, f32)>) -> NativeResult<()> {
    let mut tokens = segment.split_whitespace();
    let namespace = if segment.starts_with(|c: char| !c.is_whitespace()) {
        // Namespace scaling (`ns:2.0`) is accepted and ignored.
        tokens
            .next()
            .map(|t| t.split_once(':').map_or(t, |(name, _)| name))
            .unwrap_or("")
    } else {
        ""
    };

    for token in tokens {
        let (name, value) = match token.split_once(':') {
            Some((name, raw)) => {
                let value = raw
                    .parse::<f32>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| malformed("feature value", token))?;
                (name, value)
            }
            None => (token, 1.0),
        };
        if name.is_empty() {
            return Err(malformed("feature", token));
        }
        out.push((format!("{namespace}^{name}"), value));
    }
    Ok(())
}
