pub mod executor;
pub mod response_builder;
pub mod service;
pub mod target;
pub mod types;

pub use executor::{execute_request, execute_with, Connector, PreparedRequest, RelayOptions};
pub use response_builder::{build_response, decode_body, flatten_headers, is_json_content, RawResponse};
pub use service::{HttpRelayService, RelayService, RelayServiceExt};
pub use target::TargetUrl;
pub use types::*;
