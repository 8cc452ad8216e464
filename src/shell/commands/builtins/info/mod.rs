pub mod history;
pub mod type_cmd;
