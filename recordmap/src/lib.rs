pub mod block;
pub mod parser;
pub mod record_map;
pub mod rich_text;

pub use block::{BlockRecord, BlockType};
pub use record_map::{Record, RecordMap, Table};
pub use rich_text::{Decoration, RichText};
