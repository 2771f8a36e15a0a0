//! Domain models for the bill manager.

mod bill;
mod doctor;
mod form_state;
mod record_id;

pub use bill::*;
pub use doctor::*;
pub use form_state::*;
pub use record_id::*;
