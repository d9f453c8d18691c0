pub mod forcefields;
pub mod minimize;
