//! HTTP GET probe.

use async_trait::async_trait;
use reqwest::Client;

use crate::config::ProbeKind;
use crate::health::probe::{Probe, ProbeError, ProbeTarget};

/// Ready when `GET http://host:port/path` answers 2xx.
pub struct HttpProbe {
    target: ProbeTarget,
    url: String,
    client: Client,
}

impl HttpProbe {
    pub fn new(target: ProbeTarget) -> Result<Self, ProbeError> {
        // Dependencies live on the internal network; never route through a proxy.
        let client = Client::builder()
            .no_proxy()
            .pool_max_idle_per_host(0)
            .user_agent("readiness-gate")
            .build()?;
        let url = format!("http://{}{}", target.address(), target.http_path());

        Ok(Self { target, url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn name(&self) -> &str {
        self.target.name()
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::Http
    }

    async fn probe(&self) -> Result<(), ProbeError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ProbeError::Status(status.as_u16()))
        }
    }
}
