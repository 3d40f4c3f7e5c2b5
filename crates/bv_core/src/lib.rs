pub mod error;
pub mod models;
pub mod retry;
pub mod storage;
pub mod types;
pub mod validation;

pub use error::{Error, Result};
pub use models::InferenceModel;
pub use retry::RetryPolicy;
pub use storage::ArticleStorage;
pub use types::*;
pub use validation::{ArticleValidator, ValidationRules};
