//! Application command handlers for castup.
//!
//! This module organizes command handling into separate submodules, each responsible for a specific
//! application command (publish, history viewing, configuration).
//!
//! # Commands
//! - `publish`: Acquire audio (file / record / URL), transcode, and publish an episode
//! - `history`: List previously published episodes
//! - `config`: Open configuration file in user's preferred editor
//! - `list_devices`: List available audio input devices
//! - `logs`: Display recent log entries

pub mod config;
pub mod history;
pub mod list_devices;
pub mod logs;
pub mod publish;

pub use config::handle_config;
pub use history::handle_history;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use publish::handle_publish;
