pub mod amount;
pub mod homepage;
pub mod protocol;

pub use amount::*;
pub use homepage::*;
pub use protocol::*;
