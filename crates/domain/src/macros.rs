//! Macro for wire-level string enums
//!
//! Several domain enums travel as bare strings (report lifecycle states,
//! fallback sources, search strategies). This macro generates `as_str`,
//! `Display` and case-insensitive `FromStr` for them from one mapping table so
//! the three can never drift apart.
//!
//! # Example
//!
//! ```rust
//! use pms_domain::impl_wire_enum;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Phase {
//!     Draft,
//!     Live,
//! }
//!
//! impl_wire_enum!(Phase {
//!     Draft => "draft",
//!     Live => "live",
//! });
//!
//! assert_eq!(Phase::Live.as_str(), "live");
//! assert_eq!("DRAFT".parse::<Phase>(), Ok(Phase::Draft));
//! ```

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum.
///
/// Parsing lowercases its input first, so every mapped string must itself be
/// lowercase.
#[macro_export]
macro_rules! impl_wire_enum {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl $enum_name {
            /// Wire representation of this variant.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
