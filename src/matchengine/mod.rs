pub mod backend;
pub mod filter_engine;
pub mod predicate;
pub mod search;
pub mod store;
pub mod value;

pub use predicate::RangeBounds;
pub use store::{MatchChunk, MatchList};
pub use value::{MatchFlags, MatchObject, Needle, TypedValue};
