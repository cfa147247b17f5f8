use crate::configuration::{redis_connection, settings, EmailConfig};
use crate::tasks::send_notifications::template::render;
use crate::utils::callbacks::failure_callback;
use crate::utils::rate_limiting::EmailAPIRateLimiter;
use anyhow::Context;
use celery::error::TaskError;
use celery::prelude::Task;
use celery::task::TaskResult;
use entities::notifications::NotificationMessage;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use shared_kernel::http_client::{HttpClient, HttpClientError};
use std::collections::HashMap;
use tracing::info;
use url::Url;

#[derive(Serialize)]
struct Address<'a> {
    address: &'a str,
}

#[derive(Serialize)]
struct Recipients<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    subject: String,
    plain_text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailRequest<'a> {
    sender_address: &'a str,
    recipients: Recipients<'a>,
    content: Content,
}

#[derive(Deserialize, Debug)]
struct Response {
    id: String,
}

fn unexpected(err: anyhow::Error) -> TaskError {
    TaskError::UnexpectedError(format!("{err:?}"))
}

/// Only failures that may clear up on their own are retried. A rejected
/// request stays rejected, and an unreadable success may already have been
/// delivered.
fn delivery_failure(err: anyhow::Error) -> TaskError {
    let transient = err
        .downcast_ref::<HttpClientError>()
        .map_or(false, HttpClientError::is_transient);
    match transient {
        true => TaskError::ExpectedError(format!("{err:?}")),
        false => TaskError::UnexpectedError(format!("{err:?}")),
    }
}

#[celery::task(bind = true, max_retries = 200, retry_for_unexpected = false, on_failure = failure_callback)]
pub async fn send_email_notification(task: &Self, message: NotificationMessage) -> TaskResult<()> {
    let settings = settings().map_err(unexpected)?;
    let client = redis_connection().await.map_err(unexpected)?;

    let rate_limiter = EmailAPIRateLimiter::new(client, settings.external_api_rate_limits.email);
    let rate_limit = rate_limiter.throttle().await?;
    if !rate_limit.action_is_allowed() {
        return Task::retry_with_countdown(task, rate_limit.retry_after());
    }

    let request_id = send(&HttpClient::new(), &settings.email, &message)
        .await
        .map_err(delivery_failure)?;
    info!(
        "Sent alert {} to user {} as request {request_id}",
        message.alert_id, message.user_id
    );
    Ok(())
}

#[tracing::instrument(err, skip(client, settings, message), fields(alert_id = %message.alert_id, user_id = %message.user_id), level = "info")]
async fn send(
    client: &HttpClient,
    settings: &EmailConfig,
    message: &NotificationMessage,
) -> anyhow::Result<String> {
    let url = Url::parse(&settings.host).with_context(|| format!("Invalid url {}", &settings.host))?;

    let auth_token = settings.auth_token.expose_secret();
    let bearer_token = format!("Bearer {auth_token}");
    let headers = HashMap::from([("Authorization", bearer_token)]);

    let email = render(message);
    let body = EmailRequest {
        sender_address: &settings.sender,
        recipients: Recipients {
            to: vec![Address {
                address: &message.email,
            }],
        },
        content: Content {
            subject: email.subject,
            plain_text: email.plain_text,
        },
    };

    let response = client
        .post_json::<Response, _>(url, headers, &body)
        .await
        .with_context(|| format!("Failed to send alert {} to {}", message.alert_id, message.email))?;
    Ok(response.id)
}
