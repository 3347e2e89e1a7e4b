pub mod address;
pub mod identity;
pub mod session;

pub use address::*;
pub use identity::*;
pub use session::*;
