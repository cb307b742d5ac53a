//! Bearer token gate.
//!
//! Per request: `Unauthenticated → HeaderChecked → RevocationChecked →
//! SignatureChecked → Authenticated`, with a rejection possible at every step.
//! The revocation lookup runs before the signature check so a revoked token
//! is refused without spending a MAC computation on it.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::InternalError,
    http::{header, header::HeaderMap, StatusCode},
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse, ResponseError,
};
use futures::future::{ready, Ready};
use jwt_security::{Principal, TokenError, TokenValidator};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::error_body::ErrorBody;
use crate::metrics::AUTH_DECISIONS_TOTAL;
use crate::revocation::{fingerprint, RevocationStore};

const BEARER_SCHEME: &str = "Bearer";

const GATE_NOT_MOUNTED: &str = "Authentication middleware is not configured for this route";

/// Pipeline position. A rejection is reported with the check that refused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStage {
    Unauthenticated,
    HeaderChecked,
    RevocationChecked,
    SignatureChecked,
    Authenticated,
}

impl GateStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateStage::Unauthenticated => "unauthenticated",
            GateStage::HeaderChecked => "header_checked",
            GateStage::RevocationChecked => "revocation_checked",
            GateStage::SignatureChecked => "signature_checked",
            GateStage::Authenticated => "authenticated",
        }
    }
}

/// Why the gate refused a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthRejection {
    #[error("Authorization header is required")]
    MissingHeader,

    #[error("Authorization header format must be Bearer {{token}}")]
    BadScheme,

    #[error("Token is no longer valid (already logged out)")]
    TokenRevoked,

    #[error("Unable to verify token status")]
    StoreUnavailable,

    #[error("Invalid token")]
    Token(TokenError),
}

impl AuthRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            AuthRejection::MissingHeader => "missing_header",
            AuthRejection::BadScheme => "bad_scheme",
            AuthRejection::TokenRevoked => "token_revoked",
            AuthRejection::StoreUnavailable => "store_unavailable",
            AuthRejection::Token(e) => e.kind(),
        }
    }

    /// The check that refused the request.
    pub fn stage(&self) -> GateStage {
        match self {
            AuthRejection::MissingHeader | AuthRejection::BadScheme => GateStage::HeaderChecked,
            AuthRejection::TokenRevoked | AuthRejection::StoreUnavailable => {
                GateStage::RevocationChecked
            }
            AuthRejection::Token(_) => GateStage::SignatureChecked,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            AuthRejection::Token(e) => ErrorBody::with_details(self.to_string(), e.to_string()),
            _ => ErrorBody::new(self.to_string()),
        }
    }
}

impl ResponseError for AuthRejection {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}

/// Outcome of one pass through the gate. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allow(Principal),
    Deny(AuthRejection),
}

impl AuthDecision {
    pub fn into_result(self) -> Result<Principal, AuthRejection> {
        match self {
            AuthDecision::Allow(principal) => Ok(principal),
            AuthDecision::Deny(rejection) => Err(rejection),
        }
    }
}

/// Split `Bearer <token>` into its token.
///
/// Absent or empty header → `MissingHeader`; anything other than exactly two
/// space-separated parts starting with the literal `Bearer` → `BadScheme`.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthRejection> {
    let value = match header {
        None => return Err(AuthRejection::MissingHeader),
        Some(value) if value.is_empty() => return Err(AuthRejection::MissingHeader),
        Some(value) => value,
    };

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER_SCHEME), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthRejection::BadScheme),
    }
}

fn bearer_from_headers(headers: &HeaderMap) -> Result<String, AuthRejection> {
    match headers.get(header::AUTHORIZATION) {
        None => Err(AuthRejection::MissingHeader),
        Some(value) => {
            let value = value.to_str().map_err(|_| AuthRejection::BadScheme)?;
            extract_bearer(Some(value)).map(str::to_owned)
        }
    }
}

/// Request decision pipeline over a validator and a revocation store.
#[derive(Clone)]
pub struct AuthGate {
    validator: TokenValidator,
    revocations: RevocationStore,
}

impl AuthGate {
    pub fn new(validator: TokenValidator, revocations: RevocationStore) -> Self {
        Self {
            validator,
            revocations,
        }
    }

    /// Full pipeline starting from the raw `Authorization` header value.
    pub async fn authenticate(&self, header: Option<&str>) -> AuthDecision {
        match extract_bearer(header) {
            Ok(token) => self.authenticate_token(token).await,
            Err(rejection) => AuthDecision::Deny(self.reject(rejection)),
        }
    }

    /// Pipeline from `HeaderChecked` onward.
    pub async fn authenticate_token(&self, token: &str) -> AuthDecision {
        match self.revocations.is_revoked(token).await {
            Ok(false) => {}
            Ok(true) => {
                debug!(token = %fingerprint(token), "Rejected revoked token");
                return AuthDecision::Deny(self.reject(AuthRejection::TokenRevoked));
            }
            Err(_) => return AuthDecision::Deny(self.reject(AuthRejection::StoreUnavailable)),
        }

        match self.validator.validate(token) {
            Ok(principal) => {
                AUTH_DECISIONS_TOTAL
                    .with_label_values(&["allow", "ok"])
                    .inc();
                debug!(
                    user_id = %principal,
                    stage = GateStage::Authenticated.as_str(),
                    "Request authenticated"
                );
                AuthDecision::Allow(principal)
            }
            Err(e) => AuthDecision::Deny(self.reject(AuthRejection::Token(e))),
        }
    }

    /// Record a rejection and hand it back.
    pub fn reject(&self, rejection: AuthRejection) -> AuthRejection {
        AUTH_DECISIONS_TOTAL
            .with_label_values(&["deny", rejection.reason()])
            .inc();
        warn!(
            reason = rejection.reason(),
            stage = rejection.stage().as_str(),
            "Request rejected by auth gate"
        );
        rejection
    }

    pub fn revocations(&self) -> &RevocationStore {
        &self.revocations
    }
}

impl fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGate")
            .field("revocations", &self.revocations)
            .finish_non_exhaustive()
    }
}

/// Identity attached to an accepted request, with the token it presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    principal: Principal,
    token: String,
}

impl AuthenticatedUser {
    pub fn new(principal: Principal, token: String) -> Self {
        Self { principal, token }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Only resolvable behind [`JwtAuthMiddleware`]. A handler that asks for it
/// on an ungated route is a routing bug and answers 500, not 401.
impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        if let Some(user) = req.extensions().get::<AuthenticatedUser>() {
            return ready(Ok(user.clone()));
        }

        error!(
            path = %req.path(),
            "AuthenticatedUser requested on a route without JwtAuthMiddleware"
        );
        let response = HttpResponse::InternalServerError().json(ErrorBody::new(GATE_NOT_MOUNTED));
        ready(Err(InternalError::from_response(GATE_NOT_MOUNTED, response).into()))
    }
}

/// Wraps protected scopes. Rejected requests never reach the inner service.
#[derive(Clone)]
pub struct JwtAuthMiddleware {
    gate: Arc<AuthGate>,
}

impl JwtAuthMiddleware {
    pub fn new(gate: Arc<AuthGate>) -> Self {
        Self { gate }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = JwtAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            gate: self.gate.clone(),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    gate: Arc<AuthGate>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let gate = self.gate.clone();

        Box::pin(async move {
            let token = match bearer_from_headers(req.headers()) {
                Ok(token) => token,
                Err(rejection) => {
                    let rejection = gate.reject(rejection);
                    return Ok(req.error_response(rejection).map_into_right_body());
                }
            };

            match gate.authenticate_token(&token).await {
                AuthDecision::Allow(principal) => {
                    req.extensions_mut()
                        .insert(AuthenticatedUser::new(principal, token));
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                AuthDecision::Deny(rejection) => {
                    Ok(req.error_response(rejection).map_into_right_body())
                }
            }
        })
    }
}
