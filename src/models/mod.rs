pub mod aligned;
pub mod baseline;
pub mod output;
pub mod series;

pub use aligned::*;
pub use baseline::*;
pub use output::*;
pub use series::*;
