//! Rule checks run after every placement.

mod draw;
mod win;

pub use draw::is_full;
pub use win::has_four;
