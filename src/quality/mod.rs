pub mod checker_name;
pub mod engine;
pub mod gate;
pub mod hangup;
pub mod prompts;

pub use checker_name::*;
pub use engine::*;
pub use gate::*;
pub use hangup::*;
pub use prompts::*;
