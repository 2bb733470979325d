pub mod stock;

pub use stock::StockSnapshot;
