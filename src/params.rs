//! Text parameter parsing
//!
//! Solver parameters arrive as free text from a form or the command line.
//! This module turns them into validated numbers, falling back to the
//! documented defaults when a field is left empty.

use crate::{
    error::{BgRemovalError, Result},
    locale::Locale,
    preconditioner::{IcholConfig, DEFAULT_DISCARD_THRESHOLD, DEFAULT_SHIFTS},
};
use serde::{Deserialize, Serialize};

/// Default regularization strength of the matting solver
pub const DEFAULT_EPSILON: f64 = 1e-7;

/// Field title used in discard threshold errors
pub const DISCARD_THRESHOLD_FIELD: &str = "Discard threshold";
/// Field title used in shift list errors
pub const SHIFTS_FIELD: &str = "Shifts";
/// Field title used in epsilon errors
pub const EPSILON_FIELD: &str = "Epsilon";

/// Parse a finite floating point number, naming `title` on failure
pub fn parse_float(text: &str, title: &str, locale: Locale) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| BgRemovalError::parse(title, locale.invalid_number(title)))
}

/// Parse a comma separated list of finite numbers
///
/// Any invalid piece fails the whole list; the error names the field, not the
/// offending token.
pub fn parse_shifts(text: &str, locale: Locale) -> Result<Vec<f64>> {
    text.split(',')
        .map(|piece| {
            piece
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
        })
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| BgRemovalError::parse(SHIFTS_FIELD, locale.invalid_number_list(SHIFTS_FIELD)))
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

/// Discard threshold from optional text, default `1e-4`
pub fn resolve_discard_threshold(text: Option<&str>, locale: Locale) -> Result<f64> {
    non_empty(text).map_or(Ok(DEFAULT_DISCARD_THRESHOLD), |t| {
        parse_float(t, DISCARD_THRESHOLD_FIELD, locale)
    })
}

/// Shift sequence from optional text, default twelve-element sequence
pub fn resolve_shifts(text: Option<&str>, locale: Locale) -> Result<Vec<f64>> {
    non_empty(text).map_or_else(|| Ok(DEFAULT_SHIFTS.to_vec()), |t| parse_shifts(t, locale))
}

/// Solver epsilon from optional text, default `1e-7`
pub fn resolve_epsilon(text: Option<&str>, locale: Locale) -> Result<f64> {
    non_empty(text).map_or(Ok(DEFAULT_EPSILON), |t| parse_float(t, EPSILON_FIELD, locale))
}

/// Raw solver parameters exactly as typed by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSolverParams {
    pub discard_threshold: Option<String>,
    pub shifts: Option<String>,
    pub epsilon: Option<String>,
}

/// Validated solver parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SolverParams {
    pub ichol: IcholConfig,
    pub epsilon: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            ichol: IcholConfig::default(),
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl RawSolverParams {
    /// Parse every field, stopping at the first invalid one
    ///
    /// Fields are checked in form order: discard threshold, epsilon, shifts.
    pub fn parse(&self, locale: Locale) -> Result<SolverParams> {
        let discard_threshold = resolve_discard_threshold(self.discard_threshold.as_deref(), locale)?;
        let epsilon = resolve_epsilon(self.epsilon.as_deref(), locale)?;
        let shifts = resolve_shifts(self.shifts.as_deref(), locale)?;

        Ok(SolverParams {
            ichol: IcholConfig {
                discard_threshold,
                shifts,
            },
            epsilon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_float_matches_std_parsing() {
        for text in ["1e-4", "0.5", "-3", "10", "1E5", "  2.5  ", ".25"] {
            let expected: f64 = text.trim().parse().unwrap();
            assert_eq!(parse_float(text, "Epsilon", Locale::En).unwrap(), expected);
        }
    }

    #[test]
    fn test_parse_float_names_field() {
        for text in ["abc", "1e", "", "1,0", "inf", "NaN"] {
            let err = parse_float(text, "Discard threshold", Locale::En).unwrap_err();
            assert_eq!(err.field(), Some("Discard threshold"));
            assert!(err.to_string().starts_with("Discard threshold"));
        }
    }

    #[test]
    fn test_parse_float_localized() {
        let err = parse_float("x", "Epsilon", Locale::ZhCn).unwrap_err();
        assert_eq!(err.to_string(), "Epsilon 必须为数字或科学计数法表示的数字");
    }

    #[test]
    fn test_parse_shifts_preserves_order() {
        assert_eq!(parse_shifts("0.1,0.2", Locale::En).unwrap(), vec![0.1, 0.2]);
        assert_eq!(
            parse_shifts("10, 1e-4 ,0", Locale::En).unwrap(),
            vec![10.0, 1e-4, 0.0]
        );
    }

    #[test]
    fn test_parse_shifts_rejects_whole_list() {
        let err = parse_shifts("0.1,0.2,abc", Locale::En).unwrap_err();
        assert_eq!(err.field(), Some("Shifts"));
        assert!(!err.to_string().contains("abc"));

        // Trailing comma leaves an empty token
        assert!(parse_shifts("0.1,", Locale::En).is_err());
    }

    #[test]
    fn test_defaults_for_absent_or_empty_input() {
        assert_eq!(resolve_discard_threshold(None, Locale::En).unwrap(), 1e-4);
        assert_eq!(resolve_discard_threshold(Some(""), Locale::En).unwrap(), 1e-4);
        assert_eq!(resolve_epsilon(None, Locale::En).unwrap(), 1e-7);
        assert_eq!(resolve_epsilon(Some("   "), Locale::En).unwrap(), 1e-7);
        assert_eq!(resolve_shifts(None, Locale::En).unwrap(), DEFAULT_SHIFTS.to_vec());
        assert_eq!(resolve_shifts(Some(""), Locale::En).unwrap().len(), 12);
    }

    #[test]
    fn test_raw_params_parse() {
        let raw = RawSolverParams {
            discard_threshold: Some("1e-3".to_string()),
            shifts: Some("0.0001,0.001".to_string()),
            epsilon: None,
        };
        let params = raw.parse(Locale::En).unwrap();
        assert_eq!(params.ichol.discard_threshold, 1e-3);
        assert_eq!(params.ichol.shifts, vec![0.0001, 0.001]);
        assert_eq!(params.epsilon, DEFAULT_EPSILON);

        assert_eq!(RawSolverParams::default().parse(Locale::En).unwrap(), SolverParams::default());
    }

    #[test]
    fn test_raw_params_report_first_bad_field() {
        let raw = RawSolverParams {
            discard_threshold: Some("1e-4".to_string()),
            shifts: Some("x".to_string()),
            epsilon: Some("y".to_string()),
        };
        let err = raw.parse(Locale::En).unwrap_err();
        assert_eq!(err.field(), Some(EPSILON_FIELD));
    }
}
