mod algumon;
mod ruliweb;

pub use algumon::AlgumonAdapter;
pub use ruliweb::RuliwebAdapter;
