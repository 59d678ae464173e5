mod credential;
mod txn;

pub use credential::{Credential, UNKNOWN_INSTITUTION};
pub use txn::Transaction;
