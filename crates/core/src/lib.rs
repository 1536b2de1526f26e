// crates/core/src/lib.rs
pub mod category;
pub mod classifier;
pub mod driver;
pub mod error;
pub mod keys;
pub mod llm;
pub mod paths;
pub mod prompt;
pub mod source;
pub mod store;
pub mod types;

pub use category::Category;
pub use classifier::{Classifier, ClassifyError};
pub use driver::{BatchDriver, Credentials, RecordOutcome, RunSummary};
pub use error::*;
pub use keys::{KeyPool, KeyPoolError};
pub use source::{RowSource, VecRowSource};
pub use store::{CompletionStore, StoreFormat};
pub use types::*;
