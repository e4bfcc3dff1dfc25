pub mod discord_notifier;
pub mod job_cache;
pub mod job_fetcher;
pub mod job_pipeline;
pub mod linkedin_client;
pub mod persistence_queue;

pub use discord_notifier::*;
pub use job_cache::*;
pub use job_fetcher::*;
pub use job_pipeline::*;
pub use linkedin_client::*;
pub use persistence_queue::*;
