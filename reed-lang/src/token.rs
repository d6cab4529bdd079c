//! Token kinds and scanned literal values.
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{Blob, Name, SrcPos, Text, Tree, TreeRef};

/// A token kind produced by the scanner.
///
/// The token's spelling and literal value travel on side channels: the
/// scanner's spelling text and [`Scanned`] slot, both valid until the next
/// scan.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Token {
    Eof,
    Newline,
    Indent,
    Unindent,
    Integer,
    Real,
    Character,
    Text,
    Blob,
    Name,
    Symbol,
    Open,
    Close,
    Error,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let name = match self {
            Token::Eof => "EOF",
            Token::Newline => "NEWLINE",
            Token::Indent => "INDENT",
            Token::Unindent => "UNINDENT",
            Token::Integer => "INTEGER",
            Token::Real => "REAL",
            Token::Character => "CHARACTER",
            Token::Text => "TEXT",
            Token::Blob => "BLOB",
            Token::Name => "NAME",
            Token::Symbol => "SYMBOL",
            Token::Open => "OPEN",
            Token::Close => "CLOSE",
            Token::Error => "ERROR",
        };

        write!(f, "{name}")
    }
}

/// The last literal value produced by the scanner.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Scanned {
    #[default]
    None,
    Natural(u64),
    Real(f64),
    Character(char),
    Text(Text),
    Name(Name),
    Blob(Blob),
}

impl Scanned {
    /// Build the leaf node for the scanned value, for parser consumption.
    pub fn to_tree(&self, position: SrcPos) -> Option<TreeRef> {
        match self {
            Scanned::None => None,
            Scanned::Natural(value) => Some(Tree::natural(position, *value)),
            Scanned::Real(value) => Some(Tree::real(position, *value)),
            Scanned::Character(value) => Some(Tree::character(position, *value)),
            Scanned::Text(value) => Some(Tree::text(position, value.clone())),
            Scanned::Name(value) => Some(Tree::name(position, value.clone())),
            Scanned::Blob(value) => Some(Tree::blob(position, value.clone())),
        }
    }
}

impl Display for Scanned {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Scanned::None => Ok(()),
            Scanned::Natural(value) => write!(f, "{value}"),
            Scanned::Real(value) => write!(f, "{value}"),
            Scanned::Character(value) => write!(f, "{value}"),
            Scanned::Text(value) => write!(f, "{value}"),
            Scanned::Name(value) => write!(f, "{value}"),
            Scanned::Blob(value) => write!(f, "{value}"),
        }
    }
}
