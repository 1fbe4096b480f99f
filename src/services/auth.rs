// src/services/auth.rs

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::{
    common::error::AppError,
    config::settings::Settings,
    models::auth::{Claims, Identity},
};

// Os tokens são emitidos pelo provedor de identidade; aqui só verificamos.
#[derive(Clone)]
pub struct AuthService {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(jwt_secret: &str, issuer: Option<&str>, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.jwt_secret,
            settings.jwt_issuer.as_deref(),
            settings.jwt_audience.as_deref(),
        )
    }

    /// Token ausente, malformado ou expirado vira `Unauthorized`.
    pub fn validate_token(&self, token: &str) -> Result<Identity, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!("Token rejeitado: {}", e);
            AppError::Unauthorized
        })?;

        Ok(Identity::from(token_data.claims))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    use crate::models::auth::{Claims, ProfileMetadata};

    pub(crate) fn issue_token(secret: &str, sub: &str, email: Option<&str>, verified: bool, role: Option<&str>, ttl: Duration) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            exp: (now + ttl).timestamp() as usize,
            iat: Some(now.timestamp() as usize),
            email: email.map(str::to_string),
            email_verified: Some(verified),
            metadata: ProfileMetadata { role: role.map(str::to_string) },
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }
}
