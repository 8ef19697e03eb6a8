pub mod models;
pub mod error;
pub mod utils;

pub use models::*;
pub use error::*;
pub use utils::*;