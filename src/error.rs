use thiserror::Error;

/// Every way a game operation can be rejected.
///
/// Rejections never leave partial state behind: engines validate before they
/// mutate, and multi-field updates are committed as a single write per player.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Insufficient funds or resources, missing prerequisite, invalid target, ...
    #[error("{0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    /// The record moved to another state between check and commit.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not authorized to {action}")]
    Unauthorized { action: &'static str },
    #[error("system error: {0}")]
    System(String),
}

impl GameError {
    pub fn validation(msg: impl Into<String>) -> Self {
        GameError::Validation(msg.into())
    }

    pub fn player_not_found(id: u64) -> Self {
        GameError::NotFound {
            entity: "player",
            id,
        }
    }

    pub fn convoy_not_found(id: u64) -> Self {
        GameError::NotFound {
            entity: "convoy",
            id,
        }
    }

    pub fn listing_not_found(id: u64) -> Self {
        GameError::NotFound {
            entity: "listing",
            id,
        }
    }

    pub fn overflow(what: &str) -> Self {
        GameError::System(format!("arithmetic overflow in {what}"))
    }

    /// Conflicts and system failures may succeed when retried; validation
    /// and lookup failures will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, GameError::Conflict(_) | GameError::System(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(
            GameError::validation("not enough money").to_string(),
            "not enough money"
        );
        assert_eq!(GameError::player_not_found(7).to_string(), "player 7 not found");
        assert_eq!(
            GameError::Unauthorized {
                action: "reset players"
            }
            .to_string(),
            "not authorized to reset players"
        );
    }

    #[test]
    fn transient_classification() {
        assert!(GameError::Conflict("moved".into()).is_transient());
        assert!(GameError::overflow("income").is_transient());
        assert!(!GameError::validation("no").is_transient());
        assert!(!GameError::convoy_not_found(1).is_transient());
    }
}
