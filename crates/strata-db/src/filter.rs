//! The textual filter language.
//!
//! One filter string is one boolean expression over the fields of a content
//! type:
//!
//! ```text
//! status eq 'published' and (views gt '100' or featured istrue)
//! contains(title, 'rust') and not archived istrue
//! ```
//!
//! Terms come in three shapes: comparisons (`field eq 'literal'` with
//! `eq ne lt le gt ge`), functions (`contains(field, 'literal')` with the
//! contains/startswith/endswith/has families), and zero-argument presence
//! terms (`field istrue|isfalse|isempty|isnotempty`). Keywords are
//! case-insensitive; literals are single-quoted with `''` escaping an
//! embedded quote; `and` binds tighter than `or`; `not` negates a term or a
//! parenthesized group.
//!
//! Parsing yields a [`FilterNode`] tree. Validation against a
//! [`crate::schema::ContentSchema`] is a separate pass, performed by the SQL
//! compiler, so the tree itself stays schema-independent.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{FilterNode, FilterOperator, GroupOperator};
pub use parser::{parse_filter, parse_filters};
