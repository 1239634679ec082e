pub mod coerce;
pub mod error;
pub mod record;
pub mod traits;
pub mod types;

pub use coerce::*;
pub use error::*;
pub use record::*;
pub use traits::*;
pub use types::*;
