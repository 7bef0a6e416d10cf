pub mod failure_cache;
pub mod holding_service;
pub mod price_service;
pub mod quote_cache;
pub mod rollup_engine;
pub mod rollup_service;
pub mod tag_service;
