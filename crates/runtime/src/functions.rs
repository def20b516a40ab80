//! The XPath 1.0 core function library.
//!
//! Functions are resolved and arity-checked while lowering, so [`call`] only
//! sees well-formed calls. Only `name`, `local-name` and `id` talk to the
//! remote host.

use futures::FutureExt as _;
use futures::future::BoxFuture;
use uiaquery_script::{Condition, ElementRef, Property, RuntimeId, ScriptValue, TreeScope, decode_lines};
use uiaquery_xpath::QName;

use crate::error::QueryError;
use crate::evaluator::{Evaluator, PositionState};
use crate::plan::Plan;
use crate::value::{Value, boolean_value, number_value, split_xpath_whitespace, string_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Function {
    Boolean,
    Not,
    Concat,
    StartsWith,
    Contains,
    Count,
    True,
    False,
    Round,
    Ceiling,
    Floor,
    Id,
    Position,
    Last,
    LocalName,
    Name,
    NormalizeSpace,
    StringLength,
    Translate,
    Number,
    String,
    SubstringBefore,
    SubstringAfter,
    Substring,
    Sum,
}

const FUNCTIONS: &[Function] = &[
    Function::Boolean,
    Function::Not,
    Function::Concat,
    Function::StartsWith,
    Function::Contains,
    Function::Count,
    Function::True,
    Function::False,
    Function::Round,
    Function::Ceiling,
    Function::Floor,
    Function::Id,
    Function::Position,
    Function::Last,
    Function::LocalName,
    Function::Name,
    Function::NormalizeSpace,
    Function::StringLength,
    Function::Translate,
    Function::Number,
    Function::String,
    Function::SubstringBefore,
    Function::SubstringAfter,
    Function::Substring,
    Function::Sum,
];

impl Function {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Not => "not",
            Self::Concat => "concat",
            Self::StartsWith => "starts-with",
            Self::Contains => "contains",
            Self::Count => "count",
            Self::True => "true",
            Self::False => "false",
            Self::Round => "round",
            Self::Ceiling => "ceiling",
            Self::Floor => "floor",
            Self::Id => "id",
            Self::Position => "position",
            Self::Last => "last",
            Self::LocalName => "local-name",
            Self::Name => "name",
            Self::NormalizeSpace => "normalize-space",
            Self::StringLength => "string-length",
            Self::Translate => "translate",
            Self::Number => "number",
            Self::String => "string",
            Self::SubstringBefore => "substring-before",
            Self::SubstringAfter => "substring-after",
            Self::Substring => "substring",
            Self::Sum => "sum",
        }
    }

    /// Look up an unprefixed XPath 1.0 core function.
    pub(crate) fn resolve(name: &QName) -> Option<Self> {
        if name.prefix.is_some() {
            return None;
        }
        FUNCTIONS.iter().copied().find(|function| function.name() == name.local)
    }

    pub(crate) fn check_arity(self, count: usize) -> Result<(), QueryError> {
        let requirement = match self {
            Self::Position | Self::Last | Self::True | Self::False => (count != 0).then_some("no arguments"),
            Self::Boolean | Self::Not | Self::Count | Self::Round | Self::Ceiling | Self::Floor | Self::Id | Self::Sum => {
                (count != 1).then_some("exactly 1 argument")
            }
            Self::LocalName | Self::Name | Self::NormalizeSpace | Self::StringLength | Self::Number | Self::String => {
                (count > 1).then_some("0 or 1 arguments")
            }
            Self::StartsWith | Self::Contains | Self::SubstringBefore | Self::SubstringAfter => {
                (count != 2).then_some("exactly 2 arguments")
            }
            Self::Substring => (!(2..=3).contains(&count)).then_some("2 or 3 arguments"),
            Self::Translate => (count != 3).then_some("exactly 3 arguments"),
            Self::Concat => (count < 2).then_some("at least 2 arguments"),
        };
        match requirement {
            Some(requirement) => Err(QueryError::function(self.name(), requirement)),
            None => Ok(()),
        }
    }

    pub(crate) fn returns_number(self) -> bool {
        matches!(
            self,
            Self::Count
                | Self::Round
                | Self::Ceiling
                | Self::Floor
                | Self::Position
                | Self::Last
                | Self::StringLength
                | Self::Number
                | Self::Sum
        )
    }

    /// Whether a call with `arg_count` arguments can be evaluated without any
    /// element: no remote call, no context element, no position state.
    pub(crate) fn is_context_free(self, arg_count: usize) -> bool {
        match self {
            Self::Id | Self::Name | Self::LocalName | Self::Position | Self::Last | Self::Count | Self::Sum => false,
            Self::String | Self::Number | Self::StringLength | Self::NormalizeSpace => arg_count > 0,
            _ => true,
        }
    }
}

pub(crate) fn call<'a>(
    evaluator: &'a Evaluator<'_>,
    function: Function,
    args: &'a [Plan],
    context: &'a ElementRef,
    state: Option<PositionState>,
) -> BoxFuture<'a, Result<Vec<Value>, QueryError>> {
    async move {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(evaluator.evaluate(arg, context, state).await?);
        }
        let string_arg = |index: usize| values.get(index).map(|v| string_value(v)).unwrap_or_default();
        let number_arg = |index: usize| values.get(index).map_or(f64::NAN, |v| number_value(v));

        let value = match function {
            Function::Boolean => Value::Boolean(boolean_value(&values[0])),
            Function::Not => Value::Boolean(!boolean_value(&values[0])),
            Function::True => Value::Boolean(true),
            Function::False => Value::Boolean(false),
            Function::Concat => Value::String(values.iter().map(|v| string_value(v)).collect()),
            Function::StartsWith => Value::Boolean(string_arg(0).starts_with(&string_arg(1))),
            Function::Contains => Value::Boolean(string_arg(0).contains(&string_arg(1))),
            Function::SubstringBefore => Value::String(substring_before(&string_arg(0), &string_arg(1))),
            Function::SubstringAfter => Value::String(substring_after(&string_arg(0), &string_arg(1))),
            Function::Substring => {
                let length = (args.len() == 3).then(|| number_arg(2));
                Value::String(substring(&string_arg(0), number_arg(1), length))
            }
            Function::StringLength => {
                let text = if args.is_empty() { String::new() } else { string_arg(0) };
                Value::Number(count_as_number(text.chars().count()))
            }
            Function::NormalizeSpace => {
                let text = if args.is_empty() { String::new() } else { string_arg(0) };
                Value::String(split_xpath_whitespace(&text).collect::<Vec<_>>().join(" "))
            }
            Function::Translate => Value::String(translate(&string_arg(0), &string_arg(1), &string_arg(2))),
            Function::String => Value::String(if args.is_empty() { String::new() } else { string_arg(0) }),
            Function::Number => Value::Number(if args.is_empty() { f64::NAN } else { number_arg(0) }),
            Function::Count => Value::Number(count_as_number(values[0].len())),
            Function::Sum => Value::Number(values[0].iter().map(Value::to_number).sum()),
            Function::Round => Value::Number(round(number_arg(0))),
            Function::Ceiling => Value::Number(number_arg(0).ceil()),
            Function::Floor => Value::Number(number_arg(0).floor()),
            Function::Position => Value::Number(count_as_number(state.map_or(1, |s| s.position))),
            Function::Last => Value::Number(count_as_number(state.map_or(1, |s| s.size))),
            Function::Name | Function::LocalName => {
                let element = match values.first() {
                    None => Some(context.clone()),
                    Some(items) => match items.first() {
                        None => None,
                        Some(Value::Element(element)) => Some(element.clone()),
                        Some(_) => return Err(QueryError::function(function.name(), "a node-set argument")),
                    },
                };
                match element {
                    Some(element) => Value::String(tag_name(evaluator, &element).await?),
                    None => Value::String(String::new()),
                }
            }
            Function::Id => return id(evaluator, &values[0]).await,
        };
        Ok(vec![value])
    }
    .boxed()
}

#[allow(clippy::cast_precision_loss)]
fn count_as_number(count: usize) -> f64 {
    count as f64
}

async fn tag_name(evaluator: &Evaluator<'_>, element: &ElementRef) -> Result<String, QueryError> {
    let output = evaluator.session().execute(&element.tag_name_query()).await?;
    Ok(decode_lines(&output).into_iter().find(|line| !line.trim().is_empty()).unwrap_or_default())
}

/// `id()`: each distinct, well-formed runtime id is looked up from the
/// desktop root in a single round trip.
async fn id(evaluator: &Evaluator<'_>, values: &[Value]) -> Result<Vec<Value>, QueryError> {
    let mut ids: Vec<RuntimeId> = Vec::new();
    for value in values {
        for token in split_xpath_whitespace(&value.to_xpath_string()) {
            if let Ok(id) = RuntimeId::parse(token)
                && !ids.contains(&id)
            {
                ids.push(id);
            }
        }
    }
    let searches = ids.into_iter().map(|id| {
        let condition = Condition::PropertyEquals {
            property: Property::RuntimeId,
            value: ScriptValue::Int32Array(id.parts()),
        };
        ElementRef::DesktopRoot.find_first(TreeScope::Subtree, condition)
    });
    let found = evaluator.session().query_ids(&ElementRef::group(searches)).await?;
    Ok(ElementRef::group(found.into_iter().map(ElementRef::Resolved))
        .into_members()
        .into_iter()
        .map(Value::Element)
        .collect())
}

/// `floor(x + 0.5)`, keeping NaN, infinities and negative zero.
pub(crate) fn round(value: f64) -> f64 {
    if value.is_nan() || value.is_infinite() {
        value
    } else if (-0.5..0.0).contains(&value) {
        -0.0
    } else {
        (value + 0.5).floor()
    }
}

/// XPath 1.0 `substring`: characters whose 1-based position `p` satisfies
/// `round(start) <= p < round(start) + round(length)`.
pub(crate) fn substring(text: &str, start: f64, length: Option<f64>) -> String {
    let first = round(start);
    let end = length.map_or(f64::INFINITY, |length| first + round(length));
    text.chars()
        .enumerate()
        .filter(|(index, _)| {
            let position = count_as_number(index + 1);
            position >= first && position < end
        })
        .map(|(_, c)| c)
        .collect()
}

pub(crate) fn substring_before(text: &str, needle: &str) -> String {
    text.find(needle).map(|at| text[..at].to_owned()).unwrap_or_default()
}

pub(crate) fn substring_after(text: &str, needle: &str) -> String {
    text.find(needle).map(|at| text[at + needle.len()..].to_owned()).unwrap_or_default()
}

pub(crate) fn translate(text: &str, from: &str, to: &str) -> String {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    text.chars()
        .filter_map(|c| match from.iter().position(|f| *f == c) {
            Some(index) => to.get(index).copied(),
            None => Some(c),
        })
        .collect()
}
