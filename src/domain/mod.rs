pub mod filter;
pub mod job;
pub mod listing_page;
pub mod notification;
