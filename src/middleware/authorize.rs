use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use super::{Gates, Identity, FORBIDDEN};
use crate::error::ApiError;

#[derive(Clone)]
pub struct Authorization {
    pub gates: Gates,
    pub required: Arc<Vec<String>>,
}

/// Permission gate. Reuses an identity attached earlier in the chain.
pub async fn authorized_middleware(
    State(authorization): State<Authorization>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = match request.extensions().get::<Identity>() {
        Some(identity) => identity.clone(),
        None => {
            let (identity, session) = authorization.gates.resolve(request.headers()).await?;
            request.extensions_mut().insert(identity.clone());
            request.extensions_mut().insert(session);
            identity
        }
    };

    if !identity.permissions.allows(authorization.required.as_slice()) {
        warn!(
            "User {} denied, requires one of {:?}",
            identity.user.username, authorization.required
        );
        return Err(ApiError::forbidden(FORBIDDEN));
    }

    Ok(next.run(request).await)
}
