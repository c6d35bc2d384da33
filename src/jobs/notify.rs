//! The `notify_customers` job: mail every customer a short message.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use crate::{
    email::EmailService,
    errors::{Error, Result},
};

#[derive(Debug, Deserialize)]
struct NotifyArgs {
    message: String,
}

/// Send `args.message` to every user with a customer profile.
///
/// Individual delivery failures are logged and counted; the job fails (and is
/// retried) only when at least one recipient could not be reached.
#[instrument(skip_all, err)]
pub async fn notify_customers(pool: &PgPool, email: &EmailService, args: &serde_json::Value) -> Result<()> {
    let args: NotifyArgs = serde_json::from_value(args.clone()).map_err(|e| Error::BadRequest {
        message: format!("invalid notify_customers args: {e}"),
    })?;

    let recipients: Vec<String> =
        sqlx::query_scalar("SELECT u.email FROM users u INNER JOIN customers c ON c.user_id = u.id ORDER BY u.email")
            .fetch_all(pool)
            .await
            .map_err(crate::db::errors::DbError::from)?;

    let total = recipients.len();
    let mut failed = 0usize;
    for recipient in recipients {
        if let Err(e) = email.send_customer_notification(&recipient, &args.message).await {
            tracing::warn!("Failed to notify {recipient}: {e}");
            failed += 1;
        }
    }

    tracing::info!("Notified {}/{} customers", total - failed, total);

    if failed > 0 {
        return Err(Error::Internal {
            operation: format!("notify customers: {failed} of {total} deliveries failed"),
        });
    }
    Ok(())
}
