pub mod db_utils;
pub mod error;
pub mod pagination;
pub mod serde_utils;
