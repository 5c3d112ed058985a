mod browser_type;
mod device_type;
mod user_agent;

pub use browser_type::*;
pub use device_type::*;
pub use user_agent::*;
