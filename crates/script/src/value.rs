use crate::control_type::ControlType;
use crate::error::EncodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    None,
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Horizontal => "Horizontal",
            Self::Vertical => "Vertical",
        }
    }

    /// Accepts the enum member name (any case) or its numeric value.
    pub fn parse(text: &str) -> Result<Self, EncodeError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "none" | "0" => Ok(Self::None),
            "horizontal" | "1" => Ok(Self::Horizontal),
            "vertical" | "2" => Ok(Self::Vertical),
            _ => Err(EncodeError::Orientation(text.to_owned())),
        }
    }
}

/// A literal encoded for use in a `PropertyCondition`.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    String(String),
    Boolean(bool),
    Int32(i32),
    Int32Array(Vec<i32>),
    ControlType(ControlType),
    Orientation(Orientation),
}

impl ScriptValue {
    pub fn to_script(&self) -> String {
        match self {
            Self::String(text) => quote(text),
            Self::Boolean(true) => "$true".to_owned(),
            Self::Boolean(false) => "$false".to_owned(),
            Self::Int32(value) => format!("[int32]{value}"),
            Self::Int32Array(values) => {
                let items: Vec<String> = values.iter().map(i32::to_string).collect();
                format!("[int32[]]@({})", items.join(", "))
            }
            Self::ControlType(ct) => format!("[ControlType]::{}", ct.name()),
            Self::Orientation(orientation) => format!("[OrientationType]::{}", orientation.name()),
        }
    }
}

/// Single-quoted PowerShell string literal.
///
/// PowerShell also treats the typographic single quotes as delimiters, so those
/// are doubled along with `'`.
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for c in text.chars() {
        if matches!(c, '\'' | '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}') {
            quoted.push(c);
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

/// Convert a number to `i32` when it is integral and in range.
pub(crate) fn exact_i32(value: f64) -> Option<i32> {
    if value.fract() != 0.0 || value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(value as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Calc", "'Calc'")]
    #[case("it's", "'it''s'")]
    #[case("a\u{2019}b", "'a\u{2019}\u{2019}b'")]
    #[case("$(Stop-Computer)", "'$(Stop-Computer)'")]
    #[case("", "''")]
    fn quotes_strings(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(quote(input), expected);
    }

    #[rstest]
    #[case(ScriptValue::Boolean(true), "$true")]
    #[case(ScriptValue::Int32(-5), "[int32]-5")]
    #[case(ScriptValue::Int32Array(vec![42, 7]), "[int32[]]@(42, 7)")]
    #[case(ScriptValue::ControlType(ControlType::Window), "[ControlType]::Window")]
    #[case(ScriptValue::Orientation(Orientation::Vertical), "[OrientationType]::Vertical")]
    fn renders_values(#[case] value: ScriptValue, #[case] expected: &str) {
        assert_eq!(value.to_script(), expected);
    }

    #[rstest]
    #[case(3.0, Some(3))]
    #[case(-2_147_483_648.0, Some(i32::MIN))]
    #[case(2_147_483_648.0, None)]
    #[case(1.5, None)]
    #[case(f64::NAN, None)]
    fn integral_conversion(#[case] value: f64, #[case] expected: Option<i32>) {
        assert_eq!(exact_i32(value), expected);
    }

    #[rstest]
    fn orientation_accepts_names_and_numbers() {
        assert_eq!(Orientation::parse("horizontal"), Ok(Orientation::Horizontal));
        assert_eq!(Orientation::parse("2"), Ok(Orientation::Vertical));
        assert!(Orientation::parse("diagonal").is_err());
    }
}
