pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod fetch;
pub mod layout;
pub mod logging;
pub mod manager;
pub mod metadata;
pub mod registry;
pub mod request;
pub mod retry;
pub mod scheduler;
pub mod storage;
pub mod worker;

pub use error::{PdmError, Result};
pub use manager::DownloadManager;
