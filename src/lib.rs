pub mod config;
pub mod logging;
pub mod messaging;
pub mod overlay;
pub mod page;
pub mod settings;
pub mod storage;
