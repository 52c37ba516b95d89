use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::{Gates, Identity};
use crate::error::ApiError;

/// Session gate: attaches the caller's `Identity` and `Session` to the request
pub async fn authenticated_middleware(
    State(gates): State<Gates>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if request.extensions().get::<Identity>().is_none() {
        let (identity, session) = gates.resolve(request.headers()).await?;
        request.extensions_mut().insert(identity);
        request.extensions_mut().insert(session);
    }

    Ok(next.run(request).await)
}
