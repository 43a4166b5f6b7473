pub mod analysis;
pub mod notification;
pub mod petition;

pub use analysis::*;
pub use notification::*;
pub use petition::*;
