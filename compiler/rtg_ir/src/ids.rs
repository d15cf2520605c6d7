//! Arena indices and ranges.
//!
//! Nodes never own their children: a statement refers to its block through a
//! [`StmtRange`] into the arena's flattened statement list, an expression refers
//! to its operands through [`ExprId`]s. Ranges are append-only, so rewriting a
//! block means pushing a new range and re-pointing the parent at it.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Create an id from a raw index.
            #[inline]
            pub const fn new(index: u32) -> Self {
                $name(index)
            }

            /// Index into the owning arena vector.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Raw u32 value.
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

define_id!(
    /// Index into the expression arena.
    ExprId
);
define_id!(
    /// Index into the statement arena.
    StmtId
);
define_id!(
    /// Index into the function-definition table.
    FuncId
);
define_id!(
    /// Index into the class-definition table.
    ClassId
);
define_id!(
    /// Index into the check-plan table populated by instrumentation.
    PlanId
);

macro_rules! define_range {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
        pub struct $name {
            pub start: u32,
            pub len: u32,
        }

        impl $name {
            /// Empty range.
            pub const EMPTY: $name = $name { start: 0, len: 0 };

            /// Create a new range.
            #[inline]
            pub const fn new(start: u32, len: u32) -> Self {
                $name { start, len }
            }

            /// Whether the range is empty.
            #[inline]
            pub const fn is_empty(&self) -> bool {
                self.len == 0
            }

            /// Number of entries.
            #[inline]
            pub const fn len(&self) -> usize {
                self.len as usize
            }

            /// Slice bounds in the backing vector.
            #[inline]
            pub const fn bounds(&self) -> std::ops::Range<usize> {
                self.start as usize..(self.start as usize + self.len as usize)
            }
        }
    };
}

define_range!(
    /// Range in the flattened statement list (a block).
    StmtRange
);
define_range!(
    /// Range in the flattened expression list (call arguments, displays).
    ExprRange
);
define_range!(
    /// Range in the keyword-argument table.
    KeywordRange
);
define_range!(
    /// Range in the dict-display entry table.
    DictEntryRange
);
define_range!(
    /// Range in the parameter table.
    ParamRange
);
define_range!(
    /// Range in the import-alias table.
    AliasRange
);
