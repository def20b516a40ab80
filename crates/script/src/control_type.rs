use std::fmt;

use crate::error::EncodeError;

macro_rules! control_types {
    ($($variant:ident = $id:literal),* $(,)?) => {
        /// UI Automation control types, with their `UIA_*ControlTypeId` values.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ControlType {
            $($variant,)*
        }

        impl ControlType {
            pub const ALL: &'static [ControlType] = &[$(ControlType::$variant,)*];

            pub fn id(self) -> i32 {
                match self {
                    $(Self::$variant => $id,)*
                }
            }

            /// Programmatic name as used by `[ControlType]::<Name>`.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)*
                }
            }
        }
    };
}

control_types! {
    Button = 50000,
    Calendar = 50001,
    CheckBox = 50002,
    ComboBox = 50003,
    Edit = 50004,
    Hyperlink = 50005,
    Image = 50006,
    ListItem = 50007,
    List = 50008,
    Menu = 50009,
    MenuBar = 50010,
    MenuItem = 50011,
    ProgressBar = 50012,
    RadioButton = 50013,
    ScrollBar = 50014,
    Slider = 50015,
    Spinner = 50016,
    StatusBar = 50017,
    Tab = 50018,
    TabItem = 50019,
    Text = 50020,
    ToolBar = 50021,
    ToolTip = 50022,
    Tree = 50023,
    TreeItem = 50024,
    Custom = 50025,
    Group = 50026,
    Thumb = 50027,
    DataGrid = 50028,
    DataItem = 50029,
    Document = 50030,
    SplitButton = 50031,
    Window = 50032,
    Pane = 50033,
    Header = 50034,
    HeaderItem = 50035,
    Table = 50036,
    TitleBar = 50037,
    Separator = 50038,
    SemanticZoom = 50039,
    AppBar = 50040,
}

impl ControlType {
    /// Case-insensitive lookup by programmatic name.
    pub fn from_name(name: &str) -> Result<Self, EncodeError> {
        Self::ALL
            .iter()
            .copied()
            .find(|ct| ct.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| EncodeError::ControlType(name.to_owned()))
    }

    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|ct| ct.id() == id)
    }

    /// Control types the managed UI Automation client has no `[ControlType]`
    /// member for; they are matched through their localized type instead.
    pub fn localized_fallback(self) -> Option<&'static str> {
        match self {
            Self::AppBar => Some("app bar"),
            Self::SemanticZoom => Some("semantic zoom"),
            _ => None,
        }
    }

    /// Native types that also answer to this name in element tests.
    pub fn synonym(self) -> Option<Self> {
        match self {
            Self::List => Some(Self::DataGrid),
            Self::ListItem => Some(Self::DataItem),
            _ => None,
        }
    }

    /// Name reported as an element's tag. Inverse of [`ControlType::synonym`].
    pub fn tag_name(self) -> &'static str {
        match self {
            Self::DataGrid => Self::List.name(),
            Self::DataItem => Self::ListItem.name(),
            other => other.name(),
        }
    }
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
