//! XPath 1.0 grammar for element selectors.
//!
//! [`parse`] turns selector text into the immutable [`ast::Expr`] tree consumed
//! by the query compiler. Variable references are not part of the grammar.

pub mod ast;
pub mod parser;

pub use ast::{Axis, Expr, KindTest, Literal, LocationPath, NameTest, NodeTest, QName, Step};
pub use parser::{ParseError, XPathParser, parse};
