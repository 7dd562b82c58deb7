//! Domain models for the CuraNet portal.

mod account;
mod appointment;
mod clinical;
mod directory;
mod emergency;
mod patient;
pub mod timestamp;

pub use account::*;
pub use appointment::*;
pub use clinical::*;
pub use directory::*;
pub use emergency::*;
pub use patient::*;
