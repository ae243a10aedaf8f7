pub mod config;
pub mod error;
pub mod infra;
pub mod relay;
pub mod routes;
pub mod shared;

pub use config::Config;
pub use error::{ErrorClass, RelayError};
pub use relay::{
    execute_request, Envelope, HttpRelayService, RelayOptions, RelayService, RequestSpec,
    ResponseBody, ResponseEnvelope,
};
