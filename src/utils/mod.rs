pub mod constants;
pub mod page_timeout;

pub use constants::*;
pub use page_timeout::with_page_timeout;
