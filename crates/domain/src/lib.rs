//! Domain layer for PiHome
//!
//! Entities collected by the node daemons, the column-map representation
//! they are persisted as, and domain errors. No I/O happens here.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
