pub mod documents;
pub mod ui;
