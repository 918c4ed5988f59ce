pub mod app;
pub mod audio;
pub mod catalog;
pub mod config;
pub mod import;
pub mod library;
pub mod logging;
pub mod model;
pub mod nav;
pub mod session;
pub mod toast;
pub mod ui;
