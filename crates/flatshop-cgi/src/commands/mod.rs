//! Command handlers

pub mod cgi;
pub mod check;
pub mod init;
