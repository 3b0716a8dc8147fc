//! A terminal desktop of draggable windows hosting small apps.

pub mod apps;
pub mod config;
pub mod constants;
pub mod drivers;
pub mod error;
pub mod event_loop;
pub mod launcher;
pub mod runner;
pub mod stacking;
pub mod store;
pub mod theme;
pub mod tracing_sub;
pub mod ui;
pub mod view;
pub mod window;
