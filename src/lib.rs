pub mod backend;
pub mod cli;
pub mod config;
pub mod convert;
pub mod endpoint;
pub mod error;
pub mod gateway;
pub mod masking;
pub mod output;
pub mod paging;
pub mod schema;
pub mod validation;
pub mod verbose;
