//! Integer division with an explicit error path.

use crate::error::DivisionError;

/// Returns quotient and remainder, or an error when `denominator` is zero.
pub fn int_divide(numerator: i64, denominator: i64) -> Result<(i64, i64), DivisionError> {
    if denominator == 0 {
        return Err(DivisionError::DivisionByZero);
    }

    let quotient = numerator
        .checked_div(denominator)
        .ok_or(DivisionError::Overflow)?;
    let remainder = numerator
        .checked_rem(denominator)
        .ok_or(DivisionError::Overflow)?;

    Ok((quotient, remainder))
}

/// How close a division came to being exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closeness {
    Exact,
    Close,
    NotClose,
}

impl Closeness {
    pub fn from_remainder(remainder: i64) -> Self {
        match remainder.unsigned_abs() {
            0 => Closeness::Exact,
            1 | 2 => Closeness::Close,
            _ => Closeness::NotClose,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Closeness::Exact => "The division was exact",
            Closeness::Close => "The division was close",
            Closeness::NotClose => "The division was not close",
        }
    }
}

/// Lines printed for one division. Errors are reported and the
/// classification sees a zero remainder, so it prints the exact branch.
pub fn describe(numerator: i64, denominator: i64) -> (Result<(i64, i64), DivisionError>, Vec<String>) {
    let outcome = int_divide(numerator, denominator);

    let lines = match outcome {
        Ok((quotient, 0)) => vec![
            format!("Divide Result: {}", quotient),
            Closeness::Exact.describe().to_string(),
        ],
        Ok((quotient, remainder)) => vec![
            format!("Divide Result: {}, remainder {}", quotient, remainder),
            Closeness::from_remainder(remainder).describe().to_string(),
        ],
        Err(e) => vec![
            format!("Error: {}", e),
            Closeness::from_remainder(0).describe().to_string(),
        ],
    };

    (outcome, lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_division() {
        assert_eq!(int_divide(100, 50), Ok((2, 0)));

        let (_, lines) = describe(100, 50);
        assert_eq!(lines, vec!["Divide Result: 2", "The division was exact"]);
    }

    #[test]
    fn test_division_with_remainder() {
        assert_eq!(int_divide(7, 3), Ok((2, 1)));

        let (_, lines) = describe(7, 3);
        assert_eq!(lines[0], "Divide Result: 2, remainder 1");
        assert_eq!(lines[1], "The division was close");

        let (_, lines) = describe(17, 5);
        assert_eq!(lines[1], "The division was close");

        let (_, lines) = describe(19, 5);
        assert_eq!(lines[0], "Divide Result: 3, remainder 4");
        assert_eq!(lines[1], "The division was not close");
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(int_divide(1, 0), Err(DivisionError::DivisionByZero));

        let (outcome, lines) = describe(1, 0);
        assert!(outcome.is_err());
        assert_eq!(lines[0], "Error: can't divide by zero");
        assert_eq!(lines[1], "The division was exact");
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert_eq!(int_divide(i64::MIN, -1), Err(DivisionError::Overflow));
    }

    #[test]
    fn test_closeness_negative_remainder() {
        assert_eq!(Closeness::from_remainder(-2), Closeness::Close);
        assert_eq!(Closeness::from_remainder(-3), Closeness::NotClose);
    }
}
