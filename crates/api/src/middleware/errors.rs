use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ServerErrorCause;

/// Log the cause of any 500 produced further down the stack, together with
/// the request method and URL.
pub async fn log_server_errors(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();

    let response = next.run(req).await;
    if let Some(ServerErrorCause(cause)) = response.extensions().get::<ServerErrorCause>() {
        tracing::error!(method = %method, url = %uri, error = %cause, "Request failed");
    }
    response
}
