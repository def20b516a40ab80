use crate::control_type::ControlType;
use crate::error::EncodeError;
use crate::property::Property;
use crate::value::ScriptValue;

/// A native UI Automation search condition.
///
/// Conditions are plain values: building one never talks to the remote host,
/// and the combinators return new values instead of mutating.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    True,
    False,
    PropertyEquals { property: Property, value: ScriptValue },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    pub fn property_equals(property: Property, value: ScriptValue) -> Result<Self, EncodeError> {
        property.accepts(&value)?;
        Ok(Self::PropertyEquals { property, value })
    }

    pub fn control_type(control_type: ControlType) -> Self {
        Self::PropertyEquals {
            property: Property::ControlType,
            value: ScriptValue::ControlType(control_type),
        }
    }

    /// Condition matching an element name test such as `Window` or `ListItem`.
    ///
    /// `List`/`ListItem` also match the grid types UI Automation reports for
    /// some list controls; `AppBar`/`SemanticZoom` go through the localized
    /// control type. Returns `None` for names that are no control type.
    pub fn element_name(name: &str) -> Option<Self> {
        let control_type = ControlType::from_name(name).ok()?;
        if let Some(localized) = control_type.localized_fallback() {
            return Some(Self::PropertyEquals {
                property: Property::LocalizedControlType,
                value: ScriptValue::String(localized.to_owned()),
            });
        }
        let condition = Self::control_type(control_type);
        Some(match control_type.synonym() {
            Some(synonym) => condition.or(Self::control_type(synonym)),
            None => condition,
        })
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::True, other) | (other, Self::True) => other,
            (Self::False, _) | (_, Self::False) => Self::False,
            (left, right) => Self::And(Box::new(left), Box::new(right)),
        }
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::False, other) | (other, Self::False) => other,
            (Self::True, _) | (_, Self::True) => Self::True,
            (left, right) => Self::Or(Box::new(left), Box::new(right)),
        }
    }

    /// Conjunction of all conditions; `True` when empty.
    pub fn all(conditions: impl IntoIterator<Item = Self>) -> Self {
        conditions.into_iter().fold(Self::True, Self::and)
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Self::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Self::False)
    }

    pub fn to_script(&self) -> String {
        match self {
            Self::True => "[Condition]::TrueCondition".to_owned(),
            Self::False => "[Condition]::FalseCondition".to_owned(),
            Self::PropertyEquals { property, value } => {
                format!("[PropertyCondition]::new({}, {})", property.identifier(), value.to_script())
            }
            Self::And(left, right) => {
                format!("[AndCondition]::new({}, {})", left.to_script(), right.to_script())
            }
            Self::Or(left, right) => {
                format!("[OrCondition]::new({}, {})", left.to_script(), right.to_script())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn name_is(value: &str) -> Condition {
        Condition::property_equals(Property::Name, ScriptValue::String(value.into())).expect("encode")
    }

    #[rstest]
    fn true_and_false_simplify() {
        assert_eq!(Condition::True.and(name_is("a")), name_is("a"));
        assert_eq!(name_is("a").and(Condition::False), Condition::False);
        assert_eq!(Condition::False.or(name_is("a")), name_is("a"));
        assert_eq!(name_is("a").or(Condition::True), Condition::True);
        assert_eq!(Condition::all([]), Condition::True);
    }

    #[rstest]
    fn rejects_values_of_the_wrong_kind() {
        let err = Condition::property_equals(Property::IsEnabled, ScriptValue::String("x".into()));
        assert!(matches!(err, Err(EncodeError::WrongKind { property: "IsEnabled", .. })));
        let err = Condition::property_equals(Property::BoundingRectangle, ScriptValue::Int32(1));
        assert_eq!(err, Err(EncodeError::NotSearchable("BoundingRectangle")));
    }

    #[rstest]
    fn renders_nested_conditions() {
        let condition = Condition::control_type(ControlType::Window).and(name_is("Calc"));
        assert_eq!(
            condition.to_script(),
            "[AndCondition]::new([PropertyCondition]::new([AutomationElement]::ControlTypeProperty, \
             [ControlType]::Window), [PropertyCondition]::new([AutomationElement]::NameProperty, 'Calc'))"
        );
    }

    #[rstest]
    #[case("List", Condition::control_type(ControlType::List).or(Condition::control_type(ControlType::DataGrid)))]
    #[case("listitem", Condition::control_type(ControlType::ListItem).or(Condition::control_type(ControlType::DataItem)))]
    #[case("Button", Condition::control_type(ControlType::Button))]
    #[case(
        "AppBar",
        Condition::PropertyEquals {
            property: Property::LocalizedControlType,
            value: ScriptValue::String("app bar".into()),
        }
    )]
    #[case(
        "semanticzoom",
        Condition::PropertyEquals {
            property: Property::LocalizedControlType,
            value: ScriptValue::String("semantic zoom".into()),
        }
    )]
    fn element_names_with_synonyms(#[case] name: &str, #[case] expected: Condition) {
        assert_eq!(Condition::element_name(name), Some(expected));
    }

    #[rstest]
    fn unknown_element_name() {
        assert_eq!(Condition::element_name("Widget"), None);
    }
}
