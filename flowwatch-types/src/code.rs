//! Production codes reported by the inspection line.

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

/// Production line a unit was inspected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Line {
    A,
    B,
}

impl Line {
    /// Station the line's units are carried by.
    pub const fn location(&self) -> &'static str {
        match self {
            Line::A => "AGV 01",
            Line::B => "AGV 02",
        }
    }

    /// Product manufactured on this line.
    pub const fn product_name(&self) -> &'static str {
        match self {
            Line::A => "Product 1",
            Line::B => "Product 2",
        }
    }
}

/// One inspection outcome: which line, and whether the unit was good.
///
/// The source encoding is a line letter followed by `0` (good) or `1`
/// (defect): `A0`, `A1`, `B0`, `B1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductionCode {
    LineAGood,
    LineADefect,
    LineBGood,
    LineBDefect,
}

impl ProductionCode {
    /// All codes, in counter order.
    pub const ALL: [ProductionCode; 4] = [
        ProductionCode::LineAGood,
        ProductionCode::LineADefect,
        ProductionCode::LineBGood,
        ProductionCode::LineBDefect,
    ];

    pub const fn line(&self) -> Line {
        match self {
            ProductionCode::LineAGood | ProductionCode::LineADefect => Line::A,
            ProductionCode::LineBGood | ProductionCode::LineBDefect => Line::B,
        }
    }

    /// Whether the unit was non-conforming.
    pub const fn is_defect(&self) -> bool {
        matches!(
            self,
            ProductionCode::LineADefect | ProductionCode::LineBDefect
        )
    }

    /// The wire encoding (`A0`, `A1`, `B0`, `B1`).
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProductionCode::LineAGood => "A0",
            ProductionCode::LineADefect => "A1",
            ProductionCode::LineBGood => "B0",
            ProductionCode::LineBDefect => "B1",
        }
    }
}

impl fmt::Display for ProductionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A code string that is blank or not one of the four known codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCodeError {
    #[error("production code is blank")]
    Blank,

    #[error("unknown production code: {0:?}")]
    Unknown(String),
}

impl FromStr for ProductionCode {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "" => Err(ParseCodeError::Blank),
            "A0" => Ok(ProductionCode::LineAGood),
            "A1" => Ok(ProductionCode::LineADefect),
            "B0" => Ok(ProductionCode::LineBGood),
            "B1" => Ok(ProductionCode::LineBDefect),
            _ => Err(ParseCodeError::Unknown(normalized)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_source_encoding() {
        assert_eq!("A0".parse(), Ok(ProductionCode::LineAGood));
        assert_eq!("A1".parse(), Ok(ProductionCode::LineADefect));
        assert_eq!("B0".parse(), Ok(ProductionCode::LineBGood));
        assert_eq!("B1".parse(), Ok(ProductionCode::LineBDefect));
    }

    #[test]
    fn parse_trims_and_ignores_case() {
        assert_eq!(" b1 ".parse(), Ok(ProductionCode::LineBDefect));
    }

    #[test]
    fn parse_rejects_blank_and_unknown() {
        assert_eq!("   ".parse::<ProductionCode>(), Err(ParseCodeError::Blank));
        assert_eq!(
            "C9".parse::<ProductionCode>(),
            Err(ParseCodeError::Unknown("C9".to_string()))
        );
    }

    #[test]
    fn defect_codes_map_to_their_line() {
        assert!(ProductionCode::LineADefect.is_defect());
        assert!(!ProductionCode::LineBGood.is_defect());
        assert_eq!(ProductionCode::LineBDefect.line(), Line::B);
        assert_eq!(Line::A.location(), "AGV 01");
        assert_eq!(Line::B.product_name(), "Product 2");
    }

    #[test]
    fn display_round_trips_through_parse() {
        for code in ProductionCode::ALL {
            assert_eq!(code.to_string().parse(), Ok(code));
        }
    }
}
