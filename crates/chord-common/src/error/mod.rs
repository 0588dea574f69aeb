//! Error taxonomy shared by the gateway and REST layers

mod client_error;

pub use client_error::{ClientError, ClientResult};
