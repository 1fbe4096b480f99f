// src/common/db_utils.rs

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::error::AppError;

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Abre uma transação e define `app.organization_id` para as policies de RLS.
///
/// `set_config(..., true)` vale só até o fim da transação, então a chave
/// nunca vaza para a próxima requisição que pegar a mesma conexão.
pub(crate) async fn begin_scoped(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Transaction<'static, Postgres>, AppError> {
    // 1. Abre a transação
    let mut tx = pool.begin().await?;

    // 2. Define o tenant
    sqlx::query("SELECT set_config('app.organization_id', $1, true)")
        .bind(organization_id.to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

/// Violação de unicidade do Postgres, com o nome da constraint.
pub(crate) fn unique_violation(error: &sqlx::Error) -> Option<String> {
    error
        .as_database_error()
        .filter(|db_err| db_err.is_unique_violation())
        .map(|db_err| db_err.constraint().unwrap_or_default().to_string())
}
