pub mod batch;
pub mod record;
pub mod transcript;

pub use batch::*;
pub use record::*;
pub use transcript::*;
