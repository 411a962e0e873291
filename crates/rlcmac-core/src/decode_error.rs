use core::fmt;

use serde::Serialize;

/// Why a subtree was rejected by the schema it was decoded against
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ViolationKind {
    /// A fixed-value field did not carry its mandated value
    FixedMismatch { expected: u64, found: u64 },
    /// No union alternative matched the discriminant bits at the cursor
    NoMatchingBranch { found: u64 },
    /// Nested schema references exceeded the configured depth
    DepthExceeded,
    /// A repeated array exceeded the configured element bound
    TooManyElements,
    /// A width, count or schema handle referred to something that was never decoded or defined
    UnresolvedField { name: String },
    /// A single integer read wider than 64 bits was requested
    WidthTooLarge { bits: usize },
    /// A delegated codec rejected the bits handed to it
    ExternalCodec { codec: &'static str },
}

/// Recoverable decode failure. The output record keeps everything decoded before the failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DecodeErr {
    /// The field needs more bits than remain in the declared input
    OutOfData { field: &'static str, needed: usize, remaining: usize },
    /// The bits are present but do not satisfy the schema
    SchemaViolation { field: &'static str, kind: ViolationKind },
}

impl DecodeErr {
    pub fn violation(field: &'static str, kind: ViolationKind) -> Self {
        DecodeErr::SchemaViolation { field, kind }
    }

    pub fn is_out_of_data(&self) -> bool {
        matches!(self, DecodeErr::OutOfData { .. })
    }

    /// Name of the schema field that failed
    pub fn field(&self) -> &'static str {
        match self {
            DecodeErr::OutOfData { field, .. } => field,
            DecodeErr::SchemaViolation { field, .. } => field,
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::FixedMismatch { expected, found } => write!(f, "expected {:#x}, found {:#x}", expected, found),
            ViolationKind::NoMatchingBranch { found } => write!(f, "no alternative matches discriminant {:#b}", found),
            ViolationKind::DepthExceeded => write!(f, "nesting depth exceeded"),
            ViolationKind::TooManyElements => write!(f, "too many array elements"),
            ViolationKind::UnresolvedField { name } => write!(f, "unresolved reference `{}`", name),
            ViolationKind::WidthTooLarge { bits } => write!(f, "{} bit integer does not fit in 64 bits", bits),
            ViolationKind::ExternalCodec { codec } => write!(f, "external codec `{}` failed", codec),
        }
    }
}

impl fmt::Display for DecodeErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeErr::OutOfData { field, needed, remaining } => {
                write!(f, "out of data in `{}`: need {} bits, {} remain", field, needed, remaining)
            }
            DecodeErr::SchemaViolation { field, kind } => write!(f, "schema violation in `{}`: {}", field, kind),
        }
    }
}

impl std::error::Error for DecodeErr {}

/// Reads `$bits` bits into a local named after the field, propagating DecodeErr::OutOfData
#[macro_export]
macro_rules! let_field {
    ($cursor:expr, $ident:ident, $bits:expr) => {
        let $ident = $cursor.read_uint($bits, stringify!($ident))?;
    };
}

/// Checks whether a value matches an expected value. If not, returns a FixedMismatch violation
#[macro_export]
macro_rules! expect_value {
    ($value:ident, $expected:expr) => {
        $crate::expect_value!(@inner $value, $expected, stringify!($value))
    };
    ($value:expr, $expected:expr, $field:expr) => {
        $crate::expect_value!(@inner $value, $expected, $field)
    };

    (@inner $value:expr, $expected:expr, $field:expr) => {{
        let val: u64 = $value;
        let expected: u64 = $expected;
        if val == expected {
            Ok(())
        } else {
            Err($crate::DecodeErr::SchemaViolation {
                field: $field,
                kind: $crate::ViolationKind::FixedMismatch { expected, found: val },
            })
        }
    }};
}
