pub mod lock;
pub mod recovery;
pub mod settings_io;
pub mod storage;
