pub mod file;
pub mod remote;

pub use file::FileMappingSource;
pub use remote::RemoteMappingSource;
