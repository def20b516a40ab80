//! XPath selectors over a remote UI Automation tree.
//!
//! A selector is parsed, lowered into a plan that decides per predicate
//! whether it becomes a native search condition or a local filter, and then
//! evaluated against a [`RemoteSession`]. Every tree access is one round trip
//! over the session's [`CommandChannel`]; everything else runs locally.

mod channel;
mod commands;
mod error;
mod evaluator;
mod functions;
mod plan;
mod resolve;
mod session;
mod value;

pub use channel::{ChannelError, CommandChannel, ReplayChannel};
pub use commands::{active_element, element_property, element_rect, element_tag_name};
pub use error::{ErrorKind, QueryError};
pub use resolve::{ElementHandle, EvaluateOptions, Resolution, evaluate_selector, resolve_selector};
pub use session::{RemoteSession, SessionConfig};
pub use value::{Value, parse_number};
