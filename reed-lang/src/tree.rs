//! The polymorphic node model shared between the scanner and the parser.
//!
//! Every node is a [`Tree`] tagged with a [`SrcPos`] and a [`TreeKind`].
//! Nodes are shared through [`Rc`]; interior kinds hold strong references to
//! their children. Cycles are impossible by construction: constructors only
//! consume existing references and children are never replaced afterwards.
//!
//! The uniform contract every kind honors:
//! - `typename`, `arity`, `children` describe the node;
//! - cloning an `Rc<Tree>` shares, [`Tree::deep_clone`] duplicates;
//! - `Display` renders a source-shaped form;
//! - serde serialization freezes a tree, deserialization thaws it.
use std::{
    fmt::{self, Display, Formatter},
    mem,
    rc::Rc,
};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{Blob, Name, SrcPos, Text};

pub type TreeRef = Rc<Tree>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub position: SrcPos,
    pub kind: TreeKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TreeKind {
    Natural(u64),
    Real(f64),
    Character(char),
    Blob(Blob),
    Text(Text),
    Name(Name),
    Prefix {
        left: TreeRef,
        right: TreeRef,
    },
    Postfix {
        left: TreeRef,
        right: TreeRef,
    },
    Infix {
        opcode: TreeRef,
        left: TreeRef,
        right: TreeRef,
    },
    Block {
        child: TreeRef,
        opening: TreeRef,
        closing: TreeRef,
    },
    DelimitedText {
        value: TreeRef,
        opening: TreeRef,
        closing: TreeRef,
    },
}

impl Tree {
    pub fn natural(position: SrcPos, value: u64) -> TreeRef {
        Rc::new(Tree {
            position,
            kind: TreeKind::Natural(value),
        })
    }

    pub fn real(position: SrcPos, value: f64) -> TreeRef {
        Rc::new(Tree {
            position,
            kind: TreeKind::Real(value),
        })
    }

    pub fn character(position: SrcPos, value: char) -> TreeRef {
        Rc::new(Tree {
            position,
            kind: TreeKind::Character(value),
        })
    }

    pub fn blob(position: SrcPos, value: Blob) -> TreeRef {
        Rc::new(Tree {
            position,
            kind: TreeKind::Blob(value),
        })
    }

    pub fn text(position: SrcPos, value: Text) -> TreeRef {
        Rc::new(Tree {
            position,
            kind: TreeKind::Text(value),
        })
    }

    pub fn name(position: SrcPos, value: Name) -> TreeRef {
        Rc::new(Tree {
            position,
            kind: TreeKind::Name(value),
        })
    }

    pub fn prefix(position: SrcPos, left: TreeRef, right: TreeRef) -> TreeRef {
        Rc::new(Tree {
            position,
            kind: TreeKind::Prefix { left, right },
        })
    }

    pub fn postfix(position: SrcPos, left: TreeRef, right: TreeRef) -> TreeRef {
        Rc::new(Tree {
            position,
            kind: TreeKind::Postfix { left, right },
        })
    }

    pub fn infix(position: SrcPos, opcode: Text, left: TreeRef, right: TreeRef) -> TreeRef {
        debug_assert!(!opcode.is_empty(), "infix opcode cannot be empty");

        Rc::new(Tree {
            position,
            kind: TreeKind::Infix {
                opcode: Tree::text(position, opcode),
                left,
                right,
            },
        })
    }

    pub fn block(position: SrcPos, child: TreeRef, opening: Name, closing: Name) -> TreeRef {
        Rc::new(Tree {
            position,
            kind: TreeKind::Block {
                child,
                opening: Tree::name(position, opening),
                closing: Tree::name(position, closing),
            },
        })
    }

    pub fn delimited_text(position: SrcPos, value: Text, opening: Name, closing: Name) -> TreeRef {
        Rc::new(Tree {
            position,
            kind: TreeKind::DelimitedText {
                value: Tree::text(position, value),
                opening: Tree::name(position, opening),
                closing: Tree::name(position, closing),
            },
        })
    }

    pub fn typename(&self) -> &'static str {
        match &self.kind {
            TreeKind::Natural(_) => "natural",
            TreeKind::Real(_) => "real",
            TreeKind::Character(_) => "character",
            TreeKind::Blob(_) => "blob",
            TreeKind::Text(_) => "text",
            TreeKind::Name(_) => "name",
            TreeKind::Prefix { .. } => "prefix",
            TreeKind::Postfix { .. } => "postfix",
            TreeKind::Infix { .. } => "infix",
            TreeKind::Block { .. } => "block",
            TreeKind::DelimitedText { .. } => "delimited_text",
        }
    }

    /// The number of children.
    pub fn arity(&self) -> u32 {
        match &self.kind {
            TreeKind::Natural(_)
            | TreeKind::Real(_)
            | TreeKind::Character(_)
            | TreeKind::Blob(_)
            | TreeKind::Text(_)
            | TreeKind::Name(_) => 0,
            TreeKind::Prefix { .. } | TreeKind::Postfix { .. } => 2,
            TreeKind::Infix { .. } | TreeKind::Block { .. } | TreeKind::DelimitedText { .. } => 3,
        }
    }

    /// The children, in field order; empty for leaves.
    pub fn children(&self) -> SmallVec<[&TreeRef; 3]> {
        match &self.kind {
            TreeKind::Natural(_)
            | TreeKind::Real(_)
            | TreeKind::Character(_)
            | TreeKind::Blob(_)
            | TreeKind::Text(_)
            | TreeKind::Name(_) => SmallVec::new(),
            TreeKind::Prefix { left, right } | TreeKind::Postfix { left, right } => {
                let mut children = SmallVec::new();

                children.push(left);
                children.push(right);
                children
            }
            TreeKind::Infix {
                opcode,
                left,
                right,
            } => SmallVec::from_buf([opcode, left, right]),
            TreeKind::Block {
                child,
                opening,
                closing,
            } => SmallVec::from_buf([child, opening, closing]),
            TreeKind::DelimitedText {
                value,
                opening,
                closing,
            } => SmallVec::from_buf([value, opening, closing]),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.arity() == 0
    }

    /// Allocation size of the node and its directly owned payload bytes,
    /// not counting children.
    pub fn size_hint(&self) -> usize {
        let payload = match &self.kind {
            TreeKind::Blob(blob) => blob.len(),
            TreeKind::Text(text) => text.len(),
            TreeKind::Name(name) => name.as_bytes().len(),
            _ => 0,
        };

        mem::size_of::<Tree>() + payload
    }

    /// A structurally equal copy with all children duplicated recursively.
    pub fn deep_clone(&self) -> TreeRef {
        let kind = match &self.kind {
            TreeKind::Prefix { left, right } => TreeKind::Prefix {
                left: left.deep_clone(),
                right: right.deep_clone(),
            },
            TreeKind::Postfix { left, right } => TreeKind::Postfix {
                left: left.deep_clone(),
                right: right.deep_clone(),
            },
            TreeKind::Infix {
                opcode,
                left,
                right,
            } => TreeKind::Infix {
                opcode: opcode.deep_clone(),
                left: left.deep_clone(),
                right: right.deep_clone(),
            },
            TreeKind::Block {
                child,
                opening,
                closing,
            } => TreeKind::Block {
                child: child.deep_clone(),
                opening: opening.deep_clone(),
                closing: closing.deep_clone(),
            },
            TreeKind::DelimitedText {
                value,
                opening,
                closing,
            } => TreeKind::DelimitedText {
                value: value.deep_clone(),
                opening: opening.deep_clone(),
                closing: closing.deep_clone(),
            },
            leaf => leaf.clone(),
        };

        Rc::new(Tree {
            position: self.position,
            kind,
        })
    }

    pub fn as_natural(&self) -> Option<u64> {
        match &self.kind {
            TreeKind::Natural(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match &self.kind {
            TreeKind::Real(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_character(&self) -> Option<char> {
        match &self.kind {
            TreeKind::Character(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match &self.kind {
            TreeKind::Blob(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match &self.kind {
            TreeKind::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&Name> {
        match &self.kind {
            TreeKind::Name(value) => Some(value),
            _ => None,
        }
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.kind {
            TreeKind::Natural(value) => write!(f, "{value}"),
            TreeKind::Real(value) => write!(f, "{value}"),
            TreeKind::Character(value) => {
                write!(f, "'")?;

                if *value == '\'' {
                    write!(f, "''")?;
                } else {
                    write!(f, "{value}")?;
                }

                write!(f, "'")
            }
            TreeKind::Blob(blob) => write!(f, "{blob}"),
            TreeKind::Text(text) => {
                write!(f, "\"")?;

                for character in text.to_string_lossy().chars() {
                    if character == '"' {
                        write!(f, "\"\"")?;
                    } else {
                        write!(f, "{character}")?;
                    }
                }

                write!(f, "\"")
            }
            TreeKind::Name(name) => write!(f, "{name}"),
            TreeKind::Prefix { left, right } => write!(f, "{left} {right}"),
            TreeKind::Postfix { left, right } => write!(f, "{left} {right}"),
            TreeKind::Infix {
                opcode,
                left,
                right,
            } => {
                if let TreeKind::Text(text) = &opcode.kind {
                    write!(f, "{left} {text} {right}")
                } else {
                    write!(f, "{left} {opcode} {right}")
                }
            }
            TreeKind::Block {
                child,
                opening,
                closing,
            } => write!(f, "{opening} {child} {closing}"),
            TreeKind::DelimitedText {
                value,
                opening,
                closing,
            } => {
                if let TreeKind::Text(text) = &value.kind {
                    write!(f, "{opening}{text}{closing}")
                } else {
                    write!(f, "{opening}{value}{closing}")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_of_products() -> TreeRef {
        let two = Tree::natural(SrcPos(0), 2);
        let x = Tree::name(SrcPos(4), Name::new("x"));
        let product = Tree::infix(SrcPos(2), Text::from("*"), two, x);
        let one = Tree::natural(SrcPos(8), 1);

        Tree::infix(SrcPos(6), Text::from("+"), product, one)
    }

    #[test]
    fn arity_matches_children() {
        let tree = sum_of_products();

        assert_eq!(tree.arity(), 3);
        assert_eq!(tree.children().len(), 3);
        assert_eq!(tree.typename(), "infix");
        assert!(Tree::natural(SrcPos(0), 7).is_leaf());
    }

    #[test]
    fn sharing_bumps_the_count() {
        let leaf = Tree::natural(SrcPos(0), 42);
        let shared = Rc::clone(&leaf);
        let parent = Tree::prefix(SrcPos(0), shared, Rc::clone(&leaf));

        assert_eq!(Rc::strong_count(&leaf), 3);
        drop(parent);
        assert_eq!(Rc::strong_count(&leaf), 1);
    }

    #[test]
    fn deep_clone_is_structurally_equal_and_independent() {
        let tree = sum_of_products();
        let clone = tree.deep_clone();

        assert_eq!(*tree, *clone);

        for (child, cloned) in tree.children().iter().zip(clone.children().iter()) {
            assert!(!Rc::ptr_eq(child, cloned));
        }
    }

    #[test]
    fn render_is_source_shaped() {
        assert_eq!(sum_of_products().to_string(), "2 * x + 1");

        let mut quoted = Text::new();
        quoted.append(b"he said \"hi\"");

        assert_eq!(
            Tree::text(SrcPos(0), quoted).to_string(),
            "\"he said \"\"hi\"\"\""
        );

        let block = Tree::block(
            SrcPos(0),
            Tree::name(SrcPos(1), Name::new("x")),
            Name::new("("),
            Name::new(")"),
        );

        assert_eq!(block.to_string(), "( x )");
    }

    #[test]
    fn freeze_then_thaw_round_trips() {
        let tree = sum_of_products();
        let frozen = serde_json::to_string(&*tree).unwrap();
        let thawed: Tree = serde_json::from_str(&frozen).unwrap();

        assert_eq!(*tree, thawed);
    }

    #[test]
    fn casts_check_dynamic_kind() {
        let natural = Tree::natural(SrcPos(0), 5);

        assert_eq!(natural.as_natural(), Some(5));
        assert_eq!(natural.as_real(), None);
        assert!(natural.as_text().is_none());
    }
}
