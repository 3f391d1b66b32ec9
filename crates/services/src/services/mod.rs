pub mod history;
pub mod storage;
pub mod stream;
pub mod working_dir;
