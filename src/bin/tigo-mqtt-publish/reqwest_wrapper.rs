use std::time::Duration;

use reqwest::blocking::Client;
use tigo2mqtt::http::{BasicAuth, HttpClient, HttpResponse};

pub struct ReqwestWrapper {
    client: Client,
}

impl ReqwestWrapper {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestWrapper {
    fn get(&mut self, url: &str, auth: &BasicAuth) -> anyhow::Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .basic_auth(&auth.username, Some(&auth.password))
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(HttpResponse { status, body })
    }
}
