//! Game implementations.

pub mod connect_four;
