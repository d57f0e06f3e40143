// Library root: the application loop and its message types, shared by the
// terminal front end and the integration tests.

pub mod app;
pub mod protocol;
