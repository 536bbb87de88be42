//! Database repositories module
//!
//! Postgres implementations of the persistence ports. Row structs keep
//! the nullable sentinel columns as the database stores them; the
//! `From` conversions lift them into the tagged model enums.

pub mod event;
pub mod participant;

// Re-export repositories
pub use event::PgEventRepository;
pub use participant::PgParticipantRepository;
