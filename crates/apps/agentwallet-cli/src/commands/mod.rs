//! CLI command implementations.

mod balance;
mod derive_pda;
mod fee;
mod init;
mod pda_state;
mod workers;

pub use balance::balance;
pub use derive_pda::derive_pda;
pub use fee::fee;
pub use init::init;
pub use pda_state::pda_state;
pub use workers::workers;
