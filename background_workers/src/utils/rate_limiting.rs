use anyhow::bail;
use anyhow::Context;
use celery::error::TaskError;
use celery::task::TaskResult;
use redis_client::client::Client;

const EMAIL_API_TOKEN_KEY: &str = "email_api_tokens";
const MAX_BURST: i32 = 2;
const PERIOD_IN_SECONDS: i32 = 1;

pub struct RateLimiter {
    client: Client,
}

impl RateLimiter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn throttle(
        &self,
        key: &str,
        max_burst: i32,
        count_per_period: i32,
        period: i32,
        number_of_tokens: i32,
    ) -> anyhow::Result<RateLimitResponse> {
        /* CL.THROTTLE <key> <max_burst> <count per period> <period> [<quantity>]
         * replies with five integers: limited (0/1), total limit, remaining
         * limit, seconds until retry (-1 when allowed), seconds until reset.
         */
        let response: Vec<Vec<i32>> = redis::pipe()
            .cmd("CL.THROTTLE")
            .arg(key)
            .arg(max_burst)
            .arg(count_per_period)
            .arg(period)
            .arg(number_of_tokens)
            .query_async(&mut self.client.connection())
            .await
            .context("Failed to CL.THROTTLE")?;

        let response = response.first().context("Empty ratelimiting response")?;
        RateLimitResponse::try_from(response.as_slice())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Allowed,
    Limited,
}

#[derive(Copy, Clone, Debug)]
#[allow(dead_code)]
pub struct RateLimitResponse {
    action: Action,
    total_limit: i32,
    remaining_limit: i32,
    retry_after: i32,
    reset_after: i32,
}

impl TryFrom<&[i32]> for RateLimitResponse {
    type Error = anyhow::Error;

    fn try_from(response: &[i32]) -> Result<Self, Self::Error> {
        if response.len() < 5 {
            bail!("Unexpected response length from CL.THROTTLE");
        }

        let action = match response[0] {
            0 => Action::Allowed,
            _ => Action::Limited,
        };

        Ok(RateLimitResponse {
            action,
            total_limit: response[1],
            remaining_limit: response[2],
            retry_after: response[3],
            reset_after: response[4],
        })
    }
}

impl RateLimitResponse {
    pub(crate) fn action_is_allowed(&self) -> bool {
        matches!(self.action, Action::Allowed)
    }

    /// Seconds to wait before trying again, never negative.
    pub(crate) fn retry_after(&self) -> u32 {
        self.retry_after.max(0) as u32
    }
}

pub struct EmailAPIRateLimiter {
    rate_limiter: RateLimiter,
    emails_per_second: i32,
}

impl EmailAPIRateLimiter {
    pub fn new(client: Client, emails_per_second: usize) -> Self {
        Self {
            rate_limiter: RateLimiter::new(client),
            emails_per_second: i32::try_from(emails_per_second).unwrap_or(i32::MAX),
        }
    }

    pub async fn throttle(&self) -> TaskResult<RateLimitResponse> {
        self.rate_limiter
            .throttle(
                EMAIL_API_TOKEN_KEY,
                MAX_BURST,
                self.emails_per_second,
                PERIOD_IN_SECONDS,
                1,
            )
            .await
            .map_err(|err| TaskError::UnexpectedError(err.to_string()))
    }
}
