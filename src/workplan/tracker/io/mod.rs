pub mod edits;
pub mod excel_read;
pub mod excel_write;
