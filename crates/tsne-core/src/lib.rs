pub mod constants;
pub mod error;
pub mod filter;
pub mod grid;
pub mod points;
pub mod selector;
pub mod session;
pub mod sound;
pub mod viewport;

pub use constants::*;
pub use error::*;
pub use filter::*;
pub use grid::GridIndex;
pub use points::*;
pub use selector::*;
pub use session::*;
pub use sound::*;
pub use viewport::*;
