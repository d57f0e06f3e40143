// Library root for the terminal front end, so the binary and the tests share
// the same modules.

pub mod audio;
pub mod tui;
