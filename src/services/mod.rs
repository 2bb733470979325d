pub mod fetcher;

pub use fetcher::{RetryPolicy, StockFetcher};
