use log::{debug, info};

use crate::error::{FetchError, NoData};
use crate::http::{BasicAuth, HttpClient};
use crate::table::{extract, PollResult};

static STATUS_PATH: &str = "/cgi-bin/mmdstatus";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum NetworkState {
    Unknown,
    Online,
    Offline,
}

/// The Tigo CCA/TAP router serving the optimizer status page.
pub struct Tigo<C: HttpClient> {
    url: String,
    auth: BasicAuth,
    client: C,
    state: NetworkState,
}

impl<C: HttpClient> Tigo<C> {
    pub fn new(host: &str, auth: BasicAuth, client: C) -> Self {
        let url = format!("http://{host}{STATUS_PATH}");
        info!("Tigo status page: {url}");
        Self {
            url,
            auth,
            client,
            state: NetworkState::Unknown,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn state(&self) -> NetworkState {
        self.state
    }

    fn set_state(&mut self, new_state: NetworkState) {
        if self.state != new_state {
            self.state = new_state;
            info!("Tigo router is {new_state:?}");
        }
    }

    /// Reads the raw status page. Only a 200 answer counts as data.
    pub fn fetch(&mut self) -> Result<String, FetchError> {
        match self.client.get(&self.url, &self.auth) {
            Ok(response) if response.status == 200 => {
                self.set_state(NetworkState::Online);
                Ok(response.body)
            }
            Ok(response) => {
                debug!(
                    "Failed to read Tigo router, status code: {}",
                    response.status
                );
                self.set_state(NetworkState::Offline);
                Err(FetchError::Status(response.status))
            }
            Err(e) => {
                debug!("Error polling Tigo: {e:?}");
                self.set_state(NetworkState::Offline);
                Err(FetchError::Transport(e.to_string()))
            }
        }
    }

    /// Fetches and parses one status page.
    pub fn poll(&mut self) -> Result<PollResult, NoData> {
        let body = self.fetch()?;
        let result = extract(&body)?;
        debug!("Data parsed from Tigo: {result:?}");
        Ok(result)
    }
}
