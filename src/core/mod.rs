// Core modules implementing schema inference, bounded reads, chunked
// export/search, and error modeling.
pub mod error;
pub mod export;
pub mod format;
pub mod handle;
pub mod plan;
pub mod progress;
pub mod reader;
pub mod schema;
pub mod search;
pub mod select;
pub mod table;
