use std::fmt;

use crate::control_type::ControlType;
use crate::error::EncodeError;
use crate::runtime_id::RuntimeId;
use crate::value::{Orientation, ScriptValue, exact_i32};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    String,
    Boolean,
    Int32,
    Int32Array,
    ControlType,
    Orientation,
    Rect,
}

impl PropertyKind {
    fn describe(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Int32 => "32-bit integer",
            Self::Int32Array => "integer array",
            Self::ControlType => "control type",
            Self::Orientation => "orientation",
            Self::Rect => "rectangle",
        }
    }
}

macro_rules! properties {
    ($($variant:ident: $kind:ident, pushdown = $pushdown:literal;)*) => {
        /// `AutomationElement` properties known to the query compiler.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Property {
            $($variant,)*
        }

        impl Property {
            pub const ALL: &'static [Property] = &[$(Property::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)*
                }
            }

            pub fn kind(self) -> PropertyKind {
                match self {
                    $(Self::$variant => PropertyKind::$kind,)*
                }
            }

            /// Whether `[@Prop = literal]` predicates on this property may be
            /// turned into native search conditions.
            pub fn is_pushdown_eligible(self) -> bool {
                match self {
                    $(Self::$variant => $pushdown,)*
                }
            }
        }
    };
}

properties! {
    AcceleratorKey: String, pushdown = true;
    AccessKey: String, pushdown = true;
    AutomationId: String, pushdown = true;
    BoundingRectangle: Rect, pushdown = false;
    ClassName: String, pushdown = true;
    ControlType: ControlType, pushdown = false;
    FrameworkId: String, pushdown = true;
    HasKeyboardFocus: Boolean, pushdown = true;
    HelpText: String, pushdown = true;
    IsContentElement: Boolean, pushdown = true;
    IsControlElement: Boolean, pushdown = true;
    IsEnabled: Boolean, pushdown = true;
    IsKeyboardFocusable: Boolean, pushdown = true;
    IsOffscreen: Boolean, pushdown = true;
    IsPassword: Boolean, pushdown = true;
    IsRequiredForForm: Boolean, pushdown = true;
    ItemStatus: String, pushdown = true;
    ItemType: String, pushdown = true;
    LocalizedControlType: String, pushdown = true;
    Name: String, pushdown = true;
    NativeWindowHandle: Int32, pushdown = false;
    Orientation: Orientation, pushdown = true;
    ProcessId: Int32, pushdown = true;
    RuntimeId: Int32Array, pushdown = true;
}

impl Property {
    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name().eq_ignore_ascii_case(name))
    }

    /// `[AutomationElement]::<Name>Property`
    pub fn identifier(self) -> String {
        format!("[AutomationElement]::{}Property", self.name())
    }

    pub fn encode_str(self, text: &str) -> Result<ScriptValue, EncodeError> {
        match self.kind() {
            PropertyKind::String => Ok(ScriptValue::String(text.to_owned())),
            PropertyKind::Boolean => {
                if text.eq_ignore_ascii_case("true") {
                    Ok(ScriptValue::Boolean(true))
                } else if text.eq_ignore_ascii_case("false") {
                    Ok(ScriptValue::Boolean(false))
                } else {
                    Err(EncodeError::Boolean { property: self.name(), value: text.to_owned() })
                }
            }
            PropertyKind::Int32 => text
                .trim()
                .parse::<i32>()
                .ok()
                .or_else(|| text.trim().parse::<f64>().ok().and_then(exact_i32))
                .map(ScriptValue::Int32)
                .ok_or_else(|| EncodeError::Int32 { property: self.name(), value: text.to_owned() }),
            PropertyKind::Int32Array => {
                RuntimeId::parse(text).map(|id| ScriptValue::Int32Array(id.parts()))
            }
            PropertyKind::ControlType => ControlType::from_name(text.trim()).map(ScriptValue::ControlType),
            PropertyKind::Orientation => Orientation::parse(text).map(ScriptValue::Orientation),
            PropertyKind::Rect => Err(EncodeError::NotSearchable(self.name())),
        }
    }

    pub fn encode_number(self, value: f64) -> Result<ScriptValue, EncodeError> {
        match self.kind() {
            PropertyKind::String => Ok(ScriptValue::String(format_number(value))),
            PropertyKind::Boolean => Ok(ScriptValue::Boolean(value != 0.0 && !value.is_nan())),
            PropertyKind::Int32 => exact_i32(value)
                .map(ScriptValue::Int32)
                .ok_or_else(|| EncodeError::Int32 { property: self.name(), value: format_number(value) }),
            PropertyKind::Int32Array => exact_i32(value)
                .map(|v| ScriptValue::Int32Array(vec![v]))
                .ok_or_else(|| EncodeError::RuntimeId(format_number(value))),
            PropertyKind::ControlType => exact_i32(value)
                .and_then(ControlType::from_id)
                .map(ScriptValue::ControlType)
                .ok_or_else(|| EncodeError::ControlType(format_number(value))),
            PropertyKind::Orientation => Orientation::parse(&format_number(value)).map(ScriptValue::Orientation),
            PropertyKind::Rect => Err(EncodeError::NotSearchable(self.name())),
        }
    }

    pub fn encode_bool(self, value: bool) -> Result<ScriptValue, EncodeError> {
        match self.kind() {
            PropertyKind::Boolean => Ok(ScriptValue::Boolean(value)),
            PropertyKind::String => Ok(ScriptValue::String(value.to_string())),
            PropertyKind::Int32 => Ok(ScriptValue::Int32(i32::from(value))),
            PropertyKind::Rect => Err(EncodeError::NotSearchable(self.name())),
            kind => Err(EncodeError::WrongKind { property: self.name(), expected: kind.describe() }),
        }
    }

    /// Check that `value` matches this property's declared kind.
    pub(crate) fn accepts(self, value: &ScriptValue) -> Result<(), EncodeError> {
        let ok = matches!(
            (self.kind(), value),
            (PropertyKind::String, ScriptValue::String(_))
                | (PropertyKind::Boolean, ScriptValue::Boolean(_))
                | (PropertyKind::Int32, ScriptValue::Int32(_))
                | (PropertyKind::Int32Array, ScriptValue::Int32Array(_))
                | (PropertyKind::ControlType, ScriptValue::ControlType(_))
                | (PropertyKind::Orientation, ScriptValue::Orientation(_))
        );
        match (ok, self.kind()) {
            (true, _) => Ok(()),
            (false, PropertyKind::Rect) => Err(EncodeError::NotSearchable(self.name())),
            (false, kind) => Err(EncodeError::WrongKind { property: self.name(), expected: kind.describe() }),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// XPath 1.0 string form of a number (`2`, `2.5`, `NaN`, `-Infinity`).
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity".to_owned() } else { "-Infinity".to_owned() }
    } else if value == 0.0 {
        "0".to_owned()
    } else {
        // Display never uses exponent notation for f64
        value.to_string()
    }
}
