pub mod alert;
pub mod plot;
pub mod recommendation;
pub mod weather;

pub use alert::*;
pub use plot::*;
pub use recommendation::*;
pub use weather::*;
