// Library root: the wheel engine, quiz flow, stores and configuration shared
// by the app controller and the terminal front end.

pub mod celebration;
pub mod config;
pub mod credentials;
pub mod notifier;
pub mod quiz;
pub mod sanitize;
pub mod store;
pub mod wheel;
