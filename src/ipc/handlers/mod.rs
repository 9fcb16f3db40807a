pub mod archive;
pub mod backup;
pub mod core;
pub mod draft;
pub mod report;
pub mod session;
