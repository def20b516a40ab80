//! Building blocks for UI Automation queries executed by a remote PowerShell host.
//!
//! [`Condition`] values describe native search filters, [`ElementRef`] values
//! describe searches without running them, and [`Query`] is the serialized
//! form sent over a command channel. Decoding helpers turn the host's output
//! back into [`RuntimeId`]s and values.

mod command;
mod condition;
mod control_type;
mod element;
mod error;
mod property;
mod runtime_id;
mod scope;
mod value;
mod walkers;

pub use command::{
    PRELUDE, Query, Rect, decode_command, decode_ids, decode_lines, decode_properties, decode_property_rows,
    decode_rect, decode_rects, encode_command,
};
pub use condition::Condition;
pub use control_type::ControlType;
pub use element::{ElementRef, FindMode};
pub use error::{DecodeError, EncodeError};
pub use property::{Property, PropertyKind, format_number};
pub use runtime_id::RuntimeId;
pub use scope::TreeScope;
pub use value::{Orientation, ScriptValue, quote};
