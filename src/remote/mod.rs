mod fetcher;
mod scheduler;
mod source;

pub use fetcher::{HttpFetcher, RuleFetcher};
pub use scheduler::spawn_refresher;
pub use source::{RefreshSnapshot, RemoteSource};
