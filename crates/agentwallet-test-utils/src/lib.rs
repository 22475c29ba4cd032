pub mod clock;
pub mod helpers;
pub mod mock_chain;

pub use clock::ManualClock;
pub use helpers::*;
pub use mock_chain::MockChain;
