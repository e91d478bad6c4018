//! Repositories borrow a connection or an open transaction; services pick
//! which one and own the commit.

pub mod device;
pub mod metric;
pub mod site;
pub mod subscription;
pub mod user;
