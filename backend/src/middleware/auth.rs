//! Authentication middleware
//!
//! Verifies bearer tokens issued by the identity provider and enforces
//! branch scoping and `resource:action` permissions.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::models::{default_permissions, permission_key, Action, Resource, ADMIN_ROLE};

use crate::error::AppError;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
    pub branches: Vec<Uuid>,
    pub permissions: Vec<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    /// Check if user has a specific permission
    pub fn has_permission(&self, resource: Resource, action: Action) -> bool {
        let permission = permission_key(resource, action);
        self.permissions.contains(&permission)
    }

    pub fn require_permission(&self, resource: Resource, action: Action) -> Result<(), AppError> {
        if self.has_permission(resource, action) {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions(format!(
                "Permission denied: requires {}",
                permission_key(resource, action)
            )))
        }
    }

    /// Admins reach every branch; everyone else only the branches in their token
    pub fn can_access_branch(&self, branch_id: Uuid) -> bool {
        self.is_admin() || self.branches.contains(&branch_id)
    }

    pub fn require_branch(&self, branch_id: Uuid) -> Result<(), AppError> {
        if self.can_access_branch(branch_id) {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions(
                "You do not have access to this branch".to_string(),
            ))
        }
    }

    /// Permission and branch check in one go
    pub fn authorize(
        &self,
        resource: Resource,
        action: Action,
        branch_id: Uuid,
    ) -> Result<(), AppError> {
        self.require_permission(resource, action)?;
        self.require_branch(branch_id)
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    #[serde(default)]
    pub branches: Vec<Uuid>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl TryFrom<Claims> for AuthUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

        // Tokens without explicit permissions get the role's defaults
        let permissions = if claims.permissions.is_empty() {
            default_permissions(&claims.role)
        } else {
            claims.permissions
        };

        Ok(AuthUser {
            user_id,
            role: claims.role,
            branches: claims.branches,
            permissions,
        })
    }
}

/// Decode and validate JWT token
pub fn decode_token(token: &str, secret: &str, leeway_secs: u64) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = leeway_secs;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            AppError::InvalidToken
        })
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token.trim().to_string(),
        None => {
            return AppError::Unauthorized("Missing or invalid Authorization header".to_string())
                .into_response()
        }
    };

    let jwt = &state.config.jwt;
    let auth_user = match decode_token(&token, &jwt.secret, jwt.leeway_secs)
        .and_then(AuthUser::try_from)
    {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str, branches: Vec<Uuid>) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role: role.to_string(),
            branches,
            permissions: default_permissions(role),
        }
    }

    #[test]
    fn test_admin_reaches_every_branch() {
        let admin = user(ADMIN_ROLE, vec![]);
        assert!(admin.can_access_branch(Uuid::new_v4()));
    }

    #[test]
    fn test_branch_scoping() {
        let branch = Uuid::new_v4();
        let manager = user("manager", vec![branch]);
        assert!(manager.require_branch(branch).is_ok());
        assert!(manager.require_branch(Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_storekeeper_cannot_pay_vendors() {
        let keeper = user("storekeeper", vec![]);
        assert!(keeper.has_permission(Resource::Stock, Action::Write));
        assert!(keeper
            .require_permission(Resource::VendorPayments, Action::Write)
            .is_err());
    }

    #[test]
    fn test_claims_without_permissions_use_role_defaults() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            role: "manager".to_string(),
            branches: vec![],
            permissions: vec![],
            exp: 0,
            iat: 0,
        };
        let user = AuthUser::try_from(claims).unwrap();
        assert!(user.has_permission(Resource::Expenses, Action::Write));
    }
}
