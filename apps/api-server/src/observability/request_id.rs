//! Request ID propagation - exposes the tracing request id to clients.

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::middleware::Next;
use actix_web::{Error, HttpMessage};
use tracing_actix_web::RequestId;

/// Header name for request ID.
pub static REQUEST_ID_HEADER: &str = "x-request-id";

/// Copy the id assigned by `TracingLogger` into the response headers.
///
/// Must be registered inside `TracingLogger` so the id is already present in
/// the request extensions.
pub async fn propagate_request_id(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let request_id = req.extensions().get::<RequestId>().cloned();

    let mut res = next.call(req).await?;

    if let Some(request_id) = request_id {
        match HeaderValue::from_str(&request_id.to_string()) {
            Ok(value) => {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }
            Err(e) => tracing::warn!("Request id is not a valid header value: {}", e),
        }
    }

    Ok(res)
}
