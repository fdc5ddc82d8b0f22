pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod impute;
pub mod merge;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod render;
pub mod stats;
pub mod summary;
pub mod validate;
