//! Error types for controller and ellipsoid configuration.

use std::fmt;

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised when a controller, ellipsoid or clip-plane adjuster is
/// configured with values it cannot work with.
///
/// These are reported at construction time; per-frame math never fails.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Ellipsoid radii must be finite and positive.
    InvalidEllipsoid {
        /// Equatorial radius that was supplied.
        equatorial: f64,
        /// Polar radius that was supplied.
        polar: f64,
    },
    /// A lower bound is greater than its upper bound.
    InvertedRange {
        /// Name of the setting pair.
        setting: &'static str,
        /// The lower bound.
        min: f64,
        /// The upper bound.
        max: f64,
    },
    /// A value lies outside its permitted range.
    OutOfRange {
        /// Name of the setting.
        setting: &'static str,
        /// The rejected value.
        value: f64,
        /// Human readable description of the allowed range.
        expected: &'static str,
    },
    /// The up vector has zero length or contains non-finite components.
    DegenerateUpVector,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidEllipsoid { equatorial, polar } => {
                write!(
                    f,
                    "invalid ellipsoid radii: equatorial {equatorial}, polar {polar}"
                )
            }
            ConfigError::InvertedRange { setting, min, max } => {
                write!(f, "{setting}: minimum {min} is greater than maximum {max}")
            }
            ConfigError::OutOfRange {
                setting,
                value,
                expected,
            } => {
                write!(f, "{setting} is {value}, expected {expected}")
            }
            ConfigError::DegenerateUpVector => write!(f, "up vector must be finite and non-zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Check that `min <= max`, treating NaN on either side as an error.
pub(crate) fn check_range(setting: &'static str, min: f64, max: f64) -> Result<()> {
    if min.is_nan() || max.is_nan() || min > max {
        return Err(ConfigError::InvertedRange { setting, min, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range() {
        assert!(check_range("distance", 0.0, f64::INFINITY).is_ok());
        assert!(check_range("distance", 5.0, 5.0).is_ok());
        assert!(matches!(
            check_range("distance", 10.0, 1.0),
            Err(ConfigError::InvertedRange {
                setting: "distance",
                ..
            })
        ));
        assert!(check_range("distance", f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_display() {
        let err = ConfigError::InvertedRange {
            setting: "polar angle",
            min: 2.0,
            max: 1.0,
        };
        assert_eq!(
            err.to_string(),
            "polar angle: minimum 2 is greater than maximum 1"
        );
    }
}
