pub mod command;
pub mod completion;
pub mod interactive;
pub mod session;
