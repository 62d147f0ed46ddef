//! Configuration management for dirscope.
//!
//! User preferences ([`settings::Config`]) live in one TOML file; its `[keys]`
//! table feeds the [`keymap::Keymap`].

pub mod keymap;
pub mod settings;

pub use keymap::Keymap;
pub use settings::Config;
