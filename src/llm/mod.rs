pub mod client;
pub mod port;
pub mod retry;

pub use client::*;
pub use port::*;
pub use retry::*;
