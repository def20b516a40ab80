use serde::{Deserialize, Serialize};
use tracing::debug;
use uiaquery_script::{ElementRef, RuntimeId};

use crate::error::QueryError;
use crate::evaluator::Evaluator;
use crate::plan::{LowerOptions, lower};
use crate::session::RemoteSession;
use crate::value::{Value, elements};

/// A found element, serialized as a W3C WebDriver element reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    #[serde(rename = "element-6066-11e4-a6c6-4dc7cdd8e8a5")]
    pub id: RuntimeId,
}

impl ElementHandle {
    pub fn new(id: RuntimeId) -> Self {
        Self { id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Resolution {
    One(ElementHandle),
    Many(Vec<ElementHandle>),
}

impl Resolution {
    pub fn into_vec(self) -> Vec<ElementHandle> {
        match self {
            Self::One(handle) => vec![handle],
            Self::Many(handles) => handles,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluateOptions {
    want_all: bool,
    context: Option<RuntimeId>,
    include_context_element_in_search: bool,
}

impl EvaluateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_all_results(mut self, want_all: bool) -> Self {
        self.want_all = want_all;
        self
    }

    /// Evaluate relative paths from a previously found element instead of
    /// the automation root.
    #[must_use]
    pub fn with_context(mut self, context: Option<RuntimeId>) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_context_element_in_search(mut self, include: bool) -> Self {
        self.include_context_element_in_search = include;
        self
    }

    pub fn want_all(&self) -> bool {
        self.want_all
    }

    pub fn context(&self) -> Option<&RuntimeId> {
        self.context.as_ref()
    }
}

/// Evaluate a selector to raw values. Element values may still be
/// unrealized references.
pub async fn evaluate_selector(
    session: &RemoteSession,
    selector: &str,
    options: &EvaluateOptions,
) -> Result<Vec<Value>, QueryError> {
    let expr = uiaquery_xpath::parse(selector)?;
    let plan = lower(
        &expr,
        LowerOptions {
            want_all: options.want_all,
            include_context_element_in_search: options.include_context_element_in_search,
        },
    )?;
    let context = options.context.clone().map_or(ElementRef::Root, ElementRef::Resolved);
    let before = session.round_trips();
    let evaluator = Evaluator::new(session);
    evaluator.validate_pushdowns(&plan).await?;
    let values = evaluator.evaluate(&plan, &context, None).await?;
    debug!(selector, values = values.len(), round_trips = session.round_trips() - before, "selector evaluated");
    Ok(values)
}

/// Find the element(s) a selector designates.
///
/// With `want_all` unset, the first match is returned and no match is a
/// [`QueryError::NoSuchElement`]. Non-element results are ignored.
pub async fn resolve_selector(
    session: &RemoteSession,
    selector: &str,
    want_all: bool,
    context_element_id: Option<&str>,
    include_context_element_in_search: bool,
) -> Result<Resolution, QueryError> {
    let context = context_element_id.map(RuntimeId::parse).transpose()?;
    let options = EvaluateOptions::new()
        .with_all_results(want_all)
        .with_context(context)
        .with_context_element_in_search(include_context_element_in_search);
    let values = evaluate_selector(session, selector, &options).await?;
    let handles: Vec<ElementHandle> = realize(session, values).await?.into_iter().map(ElementHandle::new).collect();

    if want_all {
        return Ok(Resolution::Many(handles));
    }
    handles
        .into_iter()
        .next()
        .map(Resolution::One)
        .ok_or_else(|| QueryError::NoSuchElement(selector.to_owned()))
}

/// Runtime ids of the element values, realizing unresolved references in
/// one round trip.
pub(crate) async fn realize(session: &RemoteSession, values: Vec<Value>) -> Result<Vec<RuntimeId>, QueryError> {
    let group = ElementRef::group(elements(values));
    let members = group.members();
    if members.iter().all(|member| member.runtime_id().is_some()) {
        return Ok(members.iter().filter_map(ElementRef::runtime_id).cloned().collect());
    }
    let ids = session.query_ids(&group).await?;
    Ok(ElementRef::group(ids.into_iter().map(ElementRef::Resolved))
        .into_members()
        .into_iter()
        .filter_map(|member| member.runtime_id().cloned())
        .collect())
}
