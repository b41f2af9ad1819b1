//! Engine Errors

use crate::game::entity::EntityId;
use crate::game::wall::WallCorners;

/// Engine errors.
///
/// Expected outcomes of a frame (an aborted move, an empty cell) are not
/// errors; they show up as collisions or `Option`s.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid descriptor or configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Spawn destination already occupied.
    #[error("Spawn conflict with {0:?}")]
    SpawnConflict(Vec<EntityId>),

    /// Coordinate outside the type's bounds.
    #[error("Out of bounds: {0}")]
    OutOfBounds(WallCorners),

    /// Bulk relocation clash.
    #[error("Transpose conflict on {0}")]
    TransposeConflict(EntityId),

    /// No type registered under this name.
    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    /// Entity does not exist or was destroyed.
    #[error("Missing entity: {0}")]
    MissingEntity(EntityId),

    /// Game hook failure.
    #[error(transparent)]
    Hook(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            EngineError::SpawnConflict(vec![EntityId(1), EntityId(4)]).to_string(),
            "Spawn conflict with [EntityId(1), EntityId(4)]"
        );
        assert_eq!(
            EngineError::OutOfBounds(WallCorners::LEFT | WallCorners::TOP).to_string(),
            "Out of bounds: TOP|LEFT"
        );
        assert_eq!(EngineError::MissingEntity(EntityId(3)).to_string(), "Missing entity: #3");
    }

    #[test]
    fn test_hook_errors_are_transparent() {
        let err: EngineError = anyhow::anyhow!("ball fell off").into();
        assert!(matches!(err, EngineError::Hook(_)));
        assert_eq!(err.to_string(), "ball fell off");
    }
}
