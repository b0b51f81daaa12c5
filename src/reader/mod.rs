pub mod reveal;
pub mod viewport;
