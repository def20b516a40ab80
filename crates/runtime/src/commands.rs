//! Element commands that operate on an already found element.

use uiaquery_script::{ElementRef, Property, Rect, RuntimeId, decode_lines, decode_rect};

use crate::error::QueryError;
use crate::resolve::ElementHandle;
use crate::session::RemoteSession;

fn element(id: &str) -> Result<ElementRef, QueryError> {
    Ok(ElementRef::Resolved(RuntimeId::parse(id)?))
}

/// The element that currently has keyboard focus.
pub async fn active_element(session: &RemoteSession) -> Result<ElementHandle, QueryError> {
    session
        .query_ids(&ElementRef::Focused)
        .await?
        .into_iter()
        .next()
        .map(ElementHandle::new)
        .ok_or_else(|| QueryError::NoSuchElement("focused element".to_owned()))
}

/// Tag name (control type name) of an element. A stale element has none.
pub async fn element_tag_name(session: &RemoteSession, id: &str) -> Result<Option<String>, QueryError> {
    let output = session.execute(&element(id)?.tag_name_query()).await?;
    Ok(decode_lines(&output).into_iter().find(|line| !line.trim().is_empty()))
}

/// Current value of a property by name. Unknown names, null and empty
/// values are `None`.
pub async fn element_property(session: &RemoteSession, id: &str, name: &str) -> Result<Option<String>, QueryError> {
    let element = element(id)?;
    let Some(property) = Property::from_name(name) else {
        return Ok(None);
    };
    let output = session.execute(&element.property_query(property)).await?;
    let text = output.trim_end_matches(['\r', '\n']);
    Ok((!text.is_empty()).then(|| text.to_owned()))
}

/// Bounding rectangle of an element.
pub async fn element_rect(session: &RemoteSession, id: &str) -> Result<Option<Rect>, QueryError> {
    let output = session.execute(&element(id)?.rect_query()).await?;
    Ok(decode_rect(&output)?)
}
