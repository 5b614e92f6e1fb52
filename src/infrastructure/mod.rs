pub mod backoff;
pub mod key_pool;

pub use backoff::BackoffPolicy;
pub use key_pool::{mask_key, Credential, KeyPool};
