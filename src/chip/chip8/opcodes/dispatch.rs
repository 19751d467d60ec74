use ux::u4;

use crate::chip::chip8::opcodes::{Encoding, Opcode, OpcodeHandler, Slot};

/// One level of the dispatch tree. Every level holds at most one child per exact
/// nibble and at most one child for operand data. Children live on the heap, so a
/// level is small no matter how deep the tree below it is.
struct Level<C> {
    exact: [Option<Box<C>>; 16],
    operand: Option<Box<C>>,
}

impl<C> Default for Level<C> {
    fn default() -> Self {
        Level {
            exact: Default::default(),
            operand: None,
        }
    }
}

impl<C> Level<C> {
    fn slot_mut(&mut self, slot: Slot) -> &mut Option<Box<C>> {
        match slot {
            Slot::Nibble(nibble) => &mut self.exact[usize::from(u8::from(nibble))],
            Slot::Operand => &mut self.operand,
        }
    }

    /// An exact match always takes priority over operand data.
    fn resolve(&self, nibble: u4) -> Option<&C> {
        self.exact[usize::from(u8::from(nibble))]
            .as_deref()
            .or_else(|| self.operand.as_deref())
    }

    fn children(&self) -> impl Iterator<Item = &C> {
        self.exact
            .iter()
            .flatten()
            .chain(self.operand.iter())
            .map(|child| &**child)
    }
}

impl<C: Default> Level<C> {
    fn child_mut(&mut self, slot: Slot) -> &mut C {
        self.slot_mut(slot)
            .get_or_insert_with(|| Box::new(C::default()))
    }
}

/// Resolves opcodes to their handlers. The tree has four levels, one for every
/// nibble of an opcode starting with the most significant one.
///
/// Lookup descends one level per nibble: into the child registered for exactly
/// that nibble if there is one, otherwise into the operand data child. If neither
/// exists the opcode is unknown. Lookup never backtracks into the operand data
/// child once it descended into an exact child.
#[derive(Default)]
pub struct DispatchTree {
    root: Level<Level<Level<Level<OpcodeHandler>>>>,
    len: usize,
}

impl DispatchTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler`, creating missing intermediate levels on the way. Fails if
    /// a handler with the same encoding is registered already.
    pub fn insert(&mut self, handler: OpcodeHandler) -> Result<(), DispatchError> {
        let Encoding([s0, s1, s2, s3]) = handler.encoding;
        let leaf = self
            .root
            .child_mut(s0)
            .child_mut(s1)
            .child_mut(s2)
            .slot_mut(s3);

        if let Some(existing) = leaf {
            return Err(DispatchError::DuplicateEncoding {
                existing: existing.mnemonic,
                rejected: handler.mnemonic,
            });
        }

        *leaf = Some(Box::new(handler));
        self.len += 1;
        Ok(())
    }

    /// Returns the handler for `opcode`, or `None` if the opcode is unknown.
    pub fn resolve(&self, opcode: &Opcode) -> Option<&OpcodeHandler> {
        let [n0, n1, n2, n3] = opcode.nibbles();
        self.root
            .resolve(n0)?
            .resolve(n1)?
            .resolve(n2)?
            .resolve(n3)
    }

    /// The number of registered handlers.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over all registered handlers.
    pub fn handlers(&self) -> impl Iterator<Item = &OpcodeHandler> {
        self.root
            .children()
            .flat_map(Level::children)
            .flat_map(Level::children)
            .flat_map(Level::children)
    }
}

/// Captures errors when building a dispatch tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Two handlers were registered for the same encoding.
    DuplicateEncoding {
        existing: &'static str,
        rejected: &'static str,
    },
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DispatchError::DuplicateEncoding { existing, rejected } => write!(
                f,
                "Cannot register {}, its encoding is already taken by {}.",
                rejected, existing
            ),
        }
    }
}

impl std::error::Error for DispatchError {}
