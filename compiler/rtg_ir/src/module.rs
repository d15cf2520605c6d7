//! Module-level IR container.

use crate::arena::IrArena;
use crate::ids::StmtRange;
use crate::Name;

/// Version of the IR layout produced by this crate.
///
/// Bumped whenever a node kind changes meaning. Consumers refuse modules
/// carrying another version instead of misreading them.
pub const IR_VERSION: u32 = 1;

/// The structural representation of one module.
#[derive(Clone, Debug)]
pub struct Module {
    /// Dotted module name.
    pub name: Name,
    pub arena: IrArena,
    /// Top-level statements.
    pub body: StmtRange,
    /// All annotations in this module are kept unevaluated.
    pub postponed_annotations: bool,
    pub doc: Option<Name>,
    pub ir_version: u32,
}

impl Module {
    /// Wrap an arena and its top-level block.
    pub fn new(name: Name, arena: IrArena, body: StmtRange) -> Self {
        Module {
            name,
            arena,
            body,
            postponed_annotations: false,
            doc: None,
            ir_version: IR_VERSION,
        }
    }

    /// The parent package of a dotted module name (`a.b.c` -> `a.b`).
    pub fn package(&self) -> Option<&'static str> {
        self.name.as_str().rsplit_once('.').map(|(pkg, _)| pkg)
    }
}
