pub mod ast;
pub mod dims;
pub mod parser;
pub mod rewrite;
pub mod sql;


pub use dims::{DimTable, PartitionId};
pub use parser::{parse_query, ParsedQuery, ParsedSelect};
pub use rewrite::{normalize, Rewriter, DEFAULT_ID_COLUMN};
