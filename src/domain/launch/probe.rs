use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::{Error, Result};

/// Readiness check run before the parameter-server launch.
#[async_trait]
pub trait CoordinationProbe: Send + Sync {
    fn target(&self) -> String;

    async fn probe(&self) -> Result<()>;
}

/// Succeeds when a TCP connection to `address` can be opened.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    pub address: String,
    pub connect_timeout: Duration,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>) -> Self {
        TcpProbe { address: address.into(), connect_timeout: Duration::from_secs(5) }
    }
}

#[async_trait]
impl CoordinationProbe for TcpProbe {
    fn target(&self) -> String {
        self.address.clone()
    }

    async fn probe(&self) -> Result<()> {
        let failure = |reason: String| Error::CoordinationProbeFailure { target: self.address.clone(), reason };

        match timeout(self.connect_timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(failure(e.to_string())),
            Err(_) => Err(failure(format!("no connection within {:?}", self.connect_timeout))),
        }
    }
}

/// Probe that fails a fixed number of times before succeeding. Use
/// `u32::MAX` failures for a dependency that never comes up.
#[derive(Debug, Clone)]
pub struct ScriptedProbe {
    pub failures_before_success: u32,
    pub calls: Arc<AtomicU32>,
}

impl ScriptedProbe {
    pub fn new(failures_before_success: u32) -> Self {
        ScriptedProbe { failures_before_success, calls: Arc::new(AtomicU32::new(0)) }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CoordinationProbe for ScriptedProbe {
    fn target(&self) -> String {
        "scripted".to_string()
    }

    async fn probe(&self) -> Result<()> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        if previous < self.failures_before_success {
            Err(Error::CoordinationProbeFailure { target: self.target(), reason: format!("scripted failure {}", previous + 1) })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_probe_reaches_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        assert!(TcpProbe::new(address).probe().await.is_ok());
    }

    #[tokio::test]
    async fn test_tcp_probe_reports_refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = TcpProbe::new(address.clone()).probe().await.unwrap_err();
        assert!(matches!(err, Error::CoordinationProbeFailure { ref target, .. } if *target == address));
    }

    #[tokio::test]
    async fn test_scripted_probe_counts_calls() {
        let probe = ScriptedProbe::new(1);
        assert!(probe.probe().await.is_err());
        assert!(probe.probe().await.is_ok());
        assert_eq!(probe.call_count(), 2);
    }
}
