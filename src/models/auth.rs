// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Metadados públicos do perfil no provedor de identidade
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileMetadata {
    #[serde(default)]
    pub role: Option<String>,
}

// Estrutura de dados ("claims") dentro do JWT emitido pelo provedor
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (tokenIdentifier do usuário)
    pub exp: usize,  // Expiration time
    #[serde(default)]
    pub iat: Option<usize>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub metadata: ProfileMetadata,
}

// A identidade verificada que circula pelas extensions da requisição
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[schema(example = "user_2abc")]
    pub subject: String,
    #[schema(example = "ana@fabrica.com")]
    pub email: Option<String>,
    pub email_verified: bool,
    #[schema(example = "admin")]
    pub profile_role: Option<String>,
}

impl Identity {
    /// O e-mail só conta para a allowlist quando foi verificado pelo provedor.
    pub fn verified_email(&self) -> Option<&str> {
        if self.email_verified {
            self.email.as_deref()
        } else {
            None
        }
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Identity {
            subject: claims.sub,
            email: claims.email.map(|e| e.trim().to_lowercase()),
            email_verified: claims.email_verified.unwrap_or(false),
            profile_role: claims.metadata.role,
        }
    }
}
