use std::collections::HashSet;

use crate::command::Query;
use crate::condition::Condition;
use crate::property::Property;
use crate::runtime_id::RuntimeId;
use crate::scope::TreeScope;
use crate::value::quote;
use crate::walkers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindMode {
    First,
    All,
}

/// An unexecuted query for zero or more remote elements.
///
/// Nothing here talks to the remote host. Traversal methods build new
/// references; [`ElementRef::to_query`] and friends serialize them into a
/// [`Query`] that the caller sends over its command channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementRef {
    /// The automation root of the session (`$rootElement`).
    Root,
    /// The desktop (`[AutomationElement]::RootElement`).
    DesktopRoot,
    Focused,
    /// An element seen before, looked up in the host's element table.
    Resolved(RuntimeId),
    Derived {
        base: Box<ElementRef>,
        scope: TreeScope,
        condition: Condition,
        mode: FindMode,
    },
    /// Flattened and deduplicated; never nests.
    Group(Vec<ElementRef>),
}

impl ElementRef {
    pub fn resolved(id: RuntimeId) -> Self {
        Self::Resolved(id)
    }

    /// Build a group, flattening nested groups and dropping repeated members.
    ///
    /// A single member is returned as-is.
    pub fn group(members: impl IntoIterator<Item = ElementRef>) -> Self {
        let mut flat: Vec<ElementRef> = Vec::new();
        let mut seen_ids: HashSet<RuntimeId> = HashSet::new();
        for member in members.into_iter().flat_map(Self::into_members) {
            let keep = match &member {
                Self::Resolved(id) => seen_ids.insert(id.clone()),
                other => !flat.contains(other),
            };
            if keep {
                flat.push(member);
            }
        }
        if flat.len() == 1
            && let Some(only) = flat.pop()
        {
            return only;
        }
        Self::Group(flat)
    }

    /// The members this reference stands for: a group's members, otherwise itself.
    pub fn members(&self) -> &[ElementRef] {
        match self {
            Self::Group(members) => members,
            other => std::slice::from_ref(other),
        }
    }

    pub fn into_members(self) -> Vec<ElementRef> {
        match self {
            Self::Group(members) => members,
            other => vec![other],
        }
    }

    pub fn runtime_id(&self) -> Option<&RuntimeId> {
        match self {
            Self::Resolved(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Group(members) if members.is_empty())
    }

    #[must_use]
    pub fn find_first(&self, scope: TreeScope, condition: Condition) -> Self {
        self.find(scope, condition, FindMode::First)
    }

    #[must_use]
    pub fn find_all(&self, scope: TreeScope, condition: Condition) -> Self {
        self.find(scope, condition, FindMode::All)
    }

    /// Search from this reference. Groups fan out per member.
    #[must_use]
    pub fn find(&self, scope: TreeScope, condition: Condition, mode: FindMode) -> Self {
        match self {
            Self::Group(members) => {
                Self::group(members.iter().map(|member| member.find(scope, condition.clone(), mode)))
            }
            base => Self::Derived { base: Box::new(base.clone()), scope, condition, mode },
        }
    }

    /// PowerShell statements whose output is the referenced elements.
    pub fn to_script(&self) -> String {
        match self {
            Self::Root => "$rootElement".to_owned(),
            Self::DesktopRoot => "[AutomationElement]::RootElement".to_owned(),
            Self::Focused => "[AutomationElement]::FocusedElement".to_owned(),
            Self::Resolved(id) => format!("$elementTable[{}]", quote(id.as_str())),
            Self::Derived { base, scope, condition, mode } => {
                walkers::render(&base.to_script(), *scope, &condition.to_script(), *mode)
            }
            Self::Group(members) => {
                if members.is_empty() {
                    "@()".to_owned()
                } else {
                    members.iter().map(Self::to_script).collect::<Vec<_>>().join("\n")
                }
            }
        }
    }

    /// Realize the reference: store every element in the element table and
    /// return their runtime ids, one per line.
    pub fn to_query(&self) -> Query {
        self.for_each_element(
            "    $runtimeId = $element.GetRuntimeId() -join '.'\n\
             \x20   if (-not $elementTable.ContainsKey($runtimeId)) { $elementTable.Add($runtimeId, $element) }\n\
             \x20   $runtimeId\n",
        )
    }

    /// Tag name (control type) of every element, one per line.
    pub fn tag_name_query(&self) -> Query {
        self.for_each_element(&format!("    {}\n", tag_name_expr()))
    }

    /// Current value of `property` for every element, one per line.
    pub fn property_query(&self, property: Property) -> Query {
        self.for_each_element(&format!("    {}\n", property_text_expr(property)))
    }

    /// All of `properties` for every element, each as a compact JSON array of
    /// strings or nulls in the given order.
    pub fn properties_query(&self, properties: &[Property]) -> Query {
        let values: Vec<String> = properties.iter().map(|p| property_text_expr(*p)).collect();
        self.for_each_element(&format!(
            "    ConvertTo-Json -Compress -InputObject @(\n        {}\n    )\n",
            values.join(",\n        ")
        ))
    }

    /// Bounding rectangle of every element as compact JSON, one per line.
    pub fn rect_query(&self) -> Query {
        self.for_each_element(
            "    $rect = $element.Current.BoundingRectangle\n\
             \x20   [pscustomobject]@{ x = $rect.X; y = $rect.Y; width = $rect.Width; height = $rect.Height } | ConvertTo-Json -Compress\n",
        )
    }

    fn for_each_element(&self, body: &str) -> Query {
        Query::new(format!(
            "foreach ($element in @(\n{}\n)) {{\n\
             \x20   if ($null -eq $element) {{ continue }}\n\
             {body}\
             }}",
            self.to_script()
        ))
    }
}

fn tag_name_expr() -> &'static str {
    "$(\
     $type = $element.Current.ControlType.ProgrammaticName.Split('.')[-1]; \
     if ($type -eq 'DataGrid') { 'List' } elseif ($type -eq 'DataItem') { 'ListItem' } else { $type }\
     )"
}

fn property_text_expr(property: Property) -> String {
    match property {
        Property::RuntimeId => "($element.GetRuntimeId() -join '.')".to_owned(),
        Property::ControlType => tag_name_expr().to_owned(),
        other => format!(
            "$(\
             $value = $element.GetCurrentPropertyValue({}); \
             if ($null -eq $value) {{ $null }} else {{ [string]$value }}\
             )",
            other.identifier()
        ),
    }
}
