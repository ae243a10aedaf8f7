use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::error::RelayError;
use crate::relay::{Envelope, RelayService, RequestSpec};

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.relay_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

pub async fn proxy_request(
    State(service): State<Arc<dyn RelayService>>,
    payload: Result<Json<RequestSpec>, JsonRejection>,
) -> Envelope {
    let spec = match payload {
        Ok(Json(spec)) => spec,
        Err(rejection) => {
            tracing::warn!(reason = %rejection.body_text(), "Rejected relay request");
            return RelayError::InvalidRequest(rejection.body_text()).into();
        }
    };

    tracing::debug!(
        method = %spec.method,
        url = %spec.url,
        "Relaying request"
    );

    let envelope = service.execute(spec).await;

    match &envelope {
        Envelope::Success(response) => {
            tracing::debug!(status = response.status, "Target responded")
        }
        Envelope::Failure(error) => {
            tracing::debug!(code = %error.body.code, status = error.status, "Relay failed")
        }
    }

    envelope
}
