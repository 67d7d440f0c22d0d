//! Error taxonomy for the simulation core
//!
//! Terminal gameplay conditions (leaving the room, biting yourself) are not
//! errors; they are `GamePhase::GameOver` transitions. Rejected reversal turns
//! are silent no-ops. What remains here are programmer errors and broken
//! invariants that must abort the round.

use crate::sim::{ComponentMask, Entity};

/// Errors raised by the entity store, the stages and configuration loading
#[derive(thiserror::Error, Debug)]
pub enum SimError {
    /// A stage asked for a component the entity does not carry
    #[error("entity {entity} has no `{component}` component")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },

    /// No live entity carries this kind at all
    #[error("no entity carries a `{component}` component")]
    Unattached { component: &'static str },

    /// A registered stage found no entity with a combination it declared
    #[error("stage `{stage}` needs an entity with {mask:?}")]
    UnmetRequirement {
        stage: &'static str,
        mask: ComponentMask,
    },

    /// Access to an id that was never created or was destroyed
    #[error("entity {0} is not alive")]
    DeadEntity(Entity),

    /// A body chain lost its head; every downstream computation depends on it
    #[error("body chain on entity {0} has no segments")]
    EmptyBodyChain(Entity),

    /// Settings file could not be parsed
    #[error("settings parse error: {0}")]
    Settings(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Whether the error invalidates the current round
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SimError::Settings(_) | SimError::Io(_))
    }
}
