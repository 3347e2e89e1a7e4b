pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod page;
pub mod stores;
pub mod token;
pub mod utils;
pub mod validator;

pub use clock::*;
pub use self::config::*;
pub use error::*;
pub use page::*;
pub use token::*;
pub use utils::*;
pub use validator::*;
