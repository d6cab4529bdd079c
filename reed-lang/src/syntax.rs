//! Operator and block tables consulted by the scanner.
//!
//! The scanner only asks two questions: may a spelling be extended as an
//! operator, and does a name open a block (and if so, what closes it).
//! Loading syntax descriptions from source files is the loader's business;
//! a scanner given no table at all runs in discovery mode, where any
//! punctuation run is a single symbol.
use std::collections::{HashMap, HashSet};

use crate::Name;

pub trait Syntax {
    /// Whether the spelling is a known operator.
    fn is_operator(&self, spelling: &str) -> bool;

    /// The expected closing name if `opening` opens a block.
    fn block_closing(&self, opening: &Name) -> Option<Name>;
}

/// A plain operator set and opening-to-closing block map.
#[derive(Clone, Debug, Default)]
pub struct SyntaxTable {
    operators: HashSet<String>,
    blocks: HashMap<Name, Name>,
}

impl SyntaxTable {
    pub fn new() -> Self {
        SyntaxTable::default()
    }

    /// Register an operator spelling, including every leading prefix so
    /// that maximal munch can grow one character at a time.
    pub fn add_operator(&mut self, spelling: &str) {
        let mut prefix = String::new();

        for character in spelling.chars() {
            prefix.push(character);
            self.operators.insert(prefix.clone());
        }
    }

    pub fn add_block(&mut self, opening: Name, closing: Name) {
        self.blocks.insert(opening, closing);
    }
}

impl Syntax for SyntaxTable {
    fn is_operator(&self, spelling: &str) -> bool {
        self.operators.contains(spelling)
    }

    fn block_closing(&self, opening: &Name) -> Option<Name> {
        self.blocks.get(opening).cloned()
    }
}
