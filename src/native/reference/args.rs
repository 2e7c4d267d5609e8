//! Argument grammar understood by the reference engine.
//!
//! A subset of the native command line. Error messages follow the native
//! engine's wording, including the duplicate-option message the bridge
//! repairs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{NativeError, NativeResult};

/// Output transformation applied to the raw linear score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Link {
    Identity,
    Logistic,
    /// Generalized logistic, mapping onto `(-1, 1)`.
    Glf1,
}

impl Link {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "identity" => Some(Link::Identity),
            "logistic" => Some(Link::Logistic),
            "glf1" => Some(Link::Glf1),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Link::Identity => "identity",
            Link::Logistic => "logistic",
            Link::Glf1 => "glf1",
        }
    }

    pub fn apply(self, raw: f32) -> f32 {
        match self {
            Link::Identity => raw,
            Link::Logistic => 1.0 / (1.0 + (-raw).exp()),
            Link::Glf1 => 2.0 / (1.0 + (-raw).exp()) - 1.0,
        }
    }
}

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loss minimized by online updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Loss {
    #[default]
    Squared,
    /// Expects labels in `{-1, 1}`.
    Logistic,
}

impl Loss {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "squared" => Some(Loss::Squared),
            "logistic" => Some(Loss::Logistic),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Loss::Squared => "squared",
            Loss::Logistic => "logistic",
        }
    }

    /// Derivative of the loss with respect to the raw score.
    pub fn gradient(self, raw: f32, label: f32) -> f32 {
        match self {
            Loss::Squared => raw - label,
            Loss::Logistic => -label / (1.0 + (label * raw).exp()),
        }
    }
}

impl std::fmt::Display for Loss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub quiet: bool,
    pub test_only: bool,
    pub final_regressor: Option<PathBuf>,
    pub initial_regressor: Option<PathBuf>,
    pub loss: Option<Loss>,
    pub link: Option<Link>,
    pub learning_rate: Option<f32>,
}

pub(crate) fn duplicate(option: &str) -> NativeError {
    NativeError::new(format!("option '{option}' cannot be specified more than once"))
}

fn missing(option: &str) -> NativeError {
    NativeError::new(format!("the required argument for option '{option}' is missing"))
}

fn invalid(option: &str, value: &str) -> NativeError {
    NativeError::new(format!("the argument ('{value}') for option '{option}' is invalid"))
}

fn set_once<T>(slot: &mut Option<T>, option: &str, value: T) -> NativeResult<()> {
    if slot.is_some() {
        return Err(duplicate(option));
    }
    *slot = Some(value);
    Ok(())
}

/// Parse a whitespace-separated configuration string.
pub fn parse(args: &str) -> NativeResult<Options> {
    let mut opts = Options::default();
    let mut tokens = args.split_whitespace();

    while let Some(token) = tokens.next() {
        let mut value = |option: &str| tokens.next().ok_or_else(|| missing(option));

        match token {
            "--quiet" => opts.quiet = true,
            "-t" | "--testonly" => opts.test_only = true,
            "-f" | "--final_regressor" => {
                let v = value("--final_regressor")?;
                set_once(&mut opts.final_regressor, "--final_regressor", PathBuf::from(v))?;
            }
            "-i" | "--initial_regressor" => {
                let v = value("--initial_regressor")?;
                set_once(&mut opts.initial_regressor, "--initial_regressor", PathBuf::from(v))?;
            }
            "--loss_function" => {
                let v = value("--loss_function")?;
                let loss = Loss::parse(v).ok_or_else(|| invalid("--loss_function", v))?;
                set_once(&mut opts.loss, "--loss_function", loss)?;
            }
            "--link" => {
                let v = value("--link")?;
                let link = Link::parse(v).ok_or_else(|| invalid("--link", v))?;
                set_once(&mut opts.link, "--link", link)?;
            }
            "-l" | "--learning_rate" => {
                let v = value("--learning_rate")?;
                let rate = v
                    .parse::<f32>()
                    .ok()
                    .filter(|r| r.is_finite() && *r > 0.0)
                    .ok_or_else(|| invalid("--learning_rate", v))?;
                set_once(&mut opts.learning_rate, "--learning_rate", rate)?;
            }
            other => return Err(NativeError::new(format!("unrecognised option '{other}'"))),
        }
    }

    Ok(opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::DOUBLE_LINK_ERROR_MSG;

    #[test]
    fn empty_args_are_defaults() {
        assert_eq!(parse("").unwrap(), Options::default());
        assert_eq!(parse("   ").unwrap(), Options::default());
    }

    #[test]
    fn parses_full_command_line() {
        let opts = parse(
            "--quiet -t --loss_function logistic --link glf1 -l 0.25 -i in.model -f out.model",
        )
        .unwrap();
        assert!(opts.quiet);
        assert!(opts.test_only);
        assert_eq!(opts.loss, Some(Loss::Logistic));
        assert_eq!(opts.link, Some(Link::Glf1));
        assert_eq!(opts.learning_rate, Some(0.25));
        assert_eq!(opts.initial_regressor, Some(PathBuf::from("in.model")));
        assert_eq!(opts.final_regressor, Some(PathBuf::from("out.model")));
    }

    #[test]
    fn repeated_link_uses_the_native_message() {
        let err = parse("--link logistic --link identity").unwrap_err();
        assert_eq!(err.message(), DOUBLE_LINK_ERROR_MSG);
    }

    #[test]
    fn unknown_option_is_rejected() {
        let err = parse("--BAD_FEATURE___ounq24tjnasdf8h --quiet").unwrap_err();
        assert_eq!(err.message(), "unrecognised option '--BAD_FEATURE___ounq24tjnasdf8h'");
    }

    #[test]
    fn missing_and_invalid_values() {
        let err = parse("--quiet -f").unwrap_err();
        assert!(err.message().contains("'--final_regressor' is missing"));

        let err = parse("--link poisson").unwrap_err();
        assert!(err.message().contains("('poisson')"));

        let err = parse("-l -3").unwrap_err();
        assert!(err.message().contains("'--learning_rate'"));
    }

    #[test]
    fn link_functions_map_zero_to_their_midpoint() {
        assert_eq!(Link::Identity.apply(0.0), 0.0);
        assert!((Link::Logistic.apply(0.0) - 0.5).abs() < 1e-6);
        assert!(Link::Glf1.apply(0.0).abs() < 1e-6);
        assert!(Link::Glf1.apply(50.0) <= 1.0);
    }
}
