use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;

/// Three-valued SQL boolean.
///
/// The discriminants double as indexes into the constant tables below, so
/// the logical connectives are table lookups rather than branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Truth {
    False = 0,
    True = 1,
    Unknown = 2,
}

const NOT: [Truth; 3] = [Truth::True, Truth::False, Truth::Unknown];

const AND: [[Truth; 3]; 3] = [
    [Truth::False, Truth::False, Truth::False],
    [Truth::False, Truth::True, Truth::Unknown],
    [Truth::False, Truth::Unknown, Truth::Unknown],
];

const OR: [[Truth; 3]; 3] = [
    [Truth::False, Truth::True, Truth::Unknown],
    [Truth::True, Truth::True, Truth::True],
    [Truth::Unknown, Truth::True, Truth::Unknown],
];

impl Truth {
    pub fn negate(self) -> Truth {
        NOT[self as usize]
    }

    pub fn and(self, other: Truth) -> Truth {
        AND[self as usize][other as usize]
    }

    pub fn or(self, other: Truth) -> Truth {
        OR[self as usize][other as usize]
    }

    pub fn is_true(self) -> bool {
        self == Truth::True
    }

    pub fn is_unknown(self) -> bool {
        self == Truth::Unknown
    }
}

impl From<bool> for Truth {
    fn from(value: bool) -> Self {
        if value { Truth::True } else { Truth::False }
    }
}

/// Comparison kinds understood by the comparison predicates.
///
/// The discriminants are the column indexes of [`COMPARE_TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr)]
#[repr(u8)]
pub enum CompareKind {
    #[strum(serialize = "=")]
    Equals = 0,
    #[strum(serialize = "<=")]
    LessEquals = 1,
    #[strum(serialize = ">=")]
    GreaterEquals = 2,
    #[strum(serialize = "<")]
    Less = 3,
    #[strum(serialize = ">")]
    Greater = 4,
    #[strum(serialize = "!=")]
    NotEquals = 5,
    #[strum(serialize = "is null")]
    IsNull = 6,
    #[strum(serialize = "is not null")]
    IsNotNull = 7,
    #[strum(serialize = "distinct")]
    IsDistinct = 8,
}

/// Maps `(sign of compare + 1, kind)` to the predicate outcome.
///
/// For the monadic kinds (`IsNull`/`IsNotNull`) the row index is 0 for a
/// non-null operand and 1 for a null one; row 2 is unreachable for them.
#[rustfmt::skip]
pub const COMPARE_TABLE: [[Truth; 9]; 3] = {
    use Truth::{False as F, True as T, Unknown as U};
    [
        // eq le ge lt gt ne nl nn dt
        [F, T, F, T, F, T, F, T, T], // compare == -1 (non-null for monadic)
        [T, T, T, F, F, F, T, F, F], // compare ==  0 (null for monadic)
        [F, F, T, F, T, T, U, U, T], // compare ==  1
    ]
};

impl CompareKind {
    /// Outcome for a dyadic comparison whose operands compared as `ordering`.
    pub fn of_ordering(self, ordering: std::cmp::Ordering) -> Truth {
        let row = match ordering {
            std::cmp::Ordering::Less => 0,
            std::cmp::Ordering::Equal => 1,
            std::cmp::Ordering::Greater => 2,
        };
        COMPARE_TABLE[row][self as usize]
    }

    /// Outcome for a monadic null test on an operand whose nullness is given.
    pub fn of_nullness(self, is_null: bool) -> Truth {
        COMPARE_TABLE[usize::from(is_null)][self as usize]
    }

    pub fn is_monadic(self) -> bool {
        matches!(self, CompareKind::IsNull | CompareKind::IsNotNull)
    }
}
