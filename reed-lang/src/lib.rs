/**
The lexical core of the Reed programming language.

Reed is an interactive language with user-extensible operator syntax and
off-side-rule block structure. This crate turns source bytes into a token
stream plus semantic values for literals, ready for a parser to assemble
into a tree of naturals, reals, characters, texts, blobs, names, infix,
prefix, postfix and block nodes.

The [`scanner`] module holds the state machine; [`tree`] the node model
shared with the parser; [`source`] the position registry that resolves a
token's scalar position back to file, line and column; [`errors`] the
diagnostic sink with its save/commit/clear contexts; and [`syntax`] the
operator and block tables the scanner consults.
*/
pub mod blob;
pub mod errors;
pub mod scanner;
pub mod source;
pub mod syntax;
pub mod token;
pub mod tree;

pub use blob::{Blob, Name, Text};
pub use errors::{Errors, Report, Saved};
pub use scanner::{SavedIndent, Scanner};
pub use source::{PositionInfo, SourceMap, SrcPos};
pub use syntax::{Syntax, SyntaxTable};
pub use token::{Scanned, Token};
pub use tree::{Tree, TreeKind, TreeRef};
