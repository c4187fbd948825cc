mod index_handler;

pub use index_handler::*;
