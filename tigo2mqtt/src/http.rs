use std::{thread, time::Duration};

use log::debug;

/// Statuses worth asking the appliance about again.
pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

// Same idea as MqttWrapper: the library talks to this trait, the binary wraps
// a concrete client in a type implementing it.
pub trait HttpClient {
    fn get(&mut self, url: &str, auth: &BasicAuth) -> anyhow::Result<HttpResponse>;
}

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total number of requests, including the first one.
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(300),
        }
    }
}

impl RetryPolicy {
    /// Delay before the request following attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Retries GETs on transport errors and on [`RETRY_STATUSES`] with
/// exponential backoff. The last outcome is returned as-is.
pub struct Retrying<C: HttpClient> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: HttpClient> Retrying<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: HttpClient> HttpClient for Retrying<C> {
    fn get(&mut self, url: &str, auth: &BasicAuth) -> anyhow::Result<HttpResponse> {
        let mut attempt = 1;
        loop {
            let outcome = self.inner.get(url, auth);
            let retryable = match &outcome {
                Ok(response) => RETRY_STATUSES.contains(&response.status),
                Err(_) => true,
            };
            if !retryable || attempt >= self.policy.attempts {
                return outcome;
            }

            let delay = self.policy.delay(attempt);
            match &outcome {
                Ok(response) => debug!(
                    "GET {url} answered {}, retrying in {delay:?}",
                    response.status
                ),
                Err(e) => debug!("GET {url} failed: {e}, retrying in {delay:?}"),
            }
            thread::sleep(delay);
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use anyhow::anyhow;

    use super::*;

    struct Scripted {
        replies: VecDeque<Option<u16>>,
        calls: u32,
    }

    impl Scripted {
        fn new(replies: &[Option<u16>]) -> Self {
            Self {
                replies: replies.iter().copied().collect(),
                calls: 0,
            }
        }
    }

    impl HttpClient for Scripted {
        fn get(&mut self, _url: &str, _auth: &BasicAuth) -> anyhow::Result<HttpResponse> {
            self.calls += 1;
            match self.replies.pop_front().flatten() {
                Some(status) => Ok(HttpResponse {
                    status,
                    body: format!("status {status}"),
                }),
                None => Err(anyhow!("connection refused")),
            }
        }
    }

    fn auth() -> BasicAuth {
        BasicAuth {
            username: "Tigo".into(),
            password: "$olar".into(),
        }
    }

    fn retrying(replies: &[Option<u16>]) -> Retrying<Scripted> {
        let policy = RetryPolicy {
            attempts: 3,
            backoff: Duration::ZERO,
        };
        Retrying::new(Scripted::new(replies), policy)
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_millis(300));
        assert_eq!(policy.delay(2), Duration::from_millis(600));
        assert_eq!(policy.delay(3), Duration::from_millis(1200));
    }

    #[test]
    fn success_is_not_retried() {
        let mut client = retrying(&[Some(200)]);
        let response = client.get("http://tigo", &auth()).expect("response");
        assert_eq!(response.status, 200);
        assert_eq!(client.inner().calls, 1);
    }

    #[test]
    fn client_errors_are_not_retried() {
        let mut client = retrying(&[Some(401), Some(200)]);
        let response = client.get("http://tigo", &auth()).expect("response");
        assert_eq!(response.status, 401);
        assert_eq!(client.inner().calls, 1);
    }

    #[test]
    fn server_errors_are_retried_until_success() {
        let mut client = retrying(&[Some(503), None, Some(200)]);
        let response = client.get("http://tigo", &auth()).expect("response");
        assert_eq!(response.status, 200);
        assert_eq!(client.inner().calls, 3);
    }

    #[test]
    fn gives_up_after_the_last_attempt() {
        let mut client = retrying(&[Some(500), Some(500), Some(500), Some(200)]);
        let response = client.get("http://tigo", &auth()).expect("response");
        assert_eq!(response.status, 500);
        assert_eq!(client.inner().calls, 3);

        let mut client = retrying(&[None, None, None]);
        assert!(client.get("http://tigo", &auth()).is_err());
        assert_eq!(client.inner().calls, 3);
    }
}
