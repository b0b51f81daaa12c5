pub mod api;
pub mod error;
pub mod listing;
pub mod slug;
pub mod theme;
