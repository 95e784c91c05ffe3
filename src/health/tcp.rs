//! TCP connect probe.

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::config::ProbeKind;
use crate::health::probe::{Probe, ProbeError, ProbeTarget};

/// Ready as soon as the port accepts a connection.
pub struct TcpProbe {
    target: ProbeTarget,
}

impl TcpProbe {
    pub fn new(target: ProbeTarget) -> Self {
        Self { target }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    fn name(&self) -> &str {
        self.target.name()
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::Tcp
    }

    async fn probe(&self) -> Result<(), ProbeError> {
        TcpStream::connect((self.target.host(), self.target.port()))
            .await
            .map_err(ProbeError::Connect)?;
        Ok(())
    }
}
