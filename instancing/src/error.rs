//! Instancing error types.

use std::fmt;

use crate::member::MemberId;

/// Errors reported by the instance pool.
///
/// None of these are fatal: the pool stays internally consistent after any
/// of them and the offending request is simply dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Every slot is occupied and no slot is pending removal.
    CapacityExceeded { capacity: usize },
    /// The member is not currently active in the pool.
    MemberNotFound(MemberId),
    /// The pool has no channels yet or is still waiting for resources.
    NotReady,
    /// A capacity change would drop active members.
    InvalidCapacity { requested: usize, active: usize },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded { capacity } => {
                write!(f, "pool capacity exceeded (capacity {capacity})")
            }
            Self::MemberNotFound(member) => write!(f, "member {member} not found in pool"),
            Self::NotReady => write!(f, "pool is not ready"),
            Self::InvalidCapacity { requested, active } => write!(
                f,
                "invalid capacity {requested}: {active} members are active"
            ),
        }
    }
}

impl std::error::Error for PoolError {}

/// Errors that can occur while loading a pool configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read.
    Io(std::io::Error),
    /// The file is not valid TOML or has mistyped keys.
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config: {e}"),
            Self::Parse(e) => write!(f, "failed to parse config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Parse(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PoolError::CapacityExceeded { capacity: 4 };
        assert_eq!(err.to_string(), "pool capacity exceeded (capacity 4)");

        let err = PoolError::MemberNotFound(MemberId(7));
        assert_eq!(err.to_string(), "member #7 not found in pool");

        let err = PoolError::InvalidCapacity {
            requested: 2,
            active: 3,
        };
        assert_eq!(err.to_string(), "invalid capacity 2: 3 members are active");
    }

    #[test]
    fn config_error_wraps_parse_failure() {
        let parse = toml::from_str::<toml::Table>("capacity = ").unwrap_err();
        let err = ConfigError::from(parse);
        assert!(err.to_string().starts_with("failed to parse config"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
