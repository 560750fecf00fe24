/// Generate `as_str`, `ALL`, `Display`, `FromStr`, `From<T> for String` and
/// `TryFrom<String> for T` for a closed, fieldless enum.
///
/// Unknown strings are rejected, which is how ledger keys coming from the outside
/// (catalog files, chat commands, database rows) get validated at the boundary.
/// Add `#[serde(into = "String", try_from = "String")]` to the enum to route
/// Serialize/Deserialize through these impls.
macro_rules! string_enum {
    ($name:ident, $label:expr, { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $str,)+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($str => Ok($name::$variant),)+
                    "" => Err(format!("{} cannot be empty", $label)),
                    other => Err(format!("unknown {}: {other}", $label)),
                }
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.as_str().to_string()
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }
    };
}
