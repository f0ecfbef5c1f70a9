//! One browser session reused across several jobs

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::capability::{Page, Session, SessionLauncher};
use crate::core::{PickerSelection, Result};

/// Launches the wrapped launcher's session once and leases it out.
///
/// Closing a lease does nothing; call [`shutdown`](Self::shutdown) when done.
pub struct SharedSessionLauncher {
    inner: Arc<dyn SessionLauncher>,
    session: Mutex<Option<Arc<dyn Session>>>,
}

impl SharedSessionLauncher {
    pub fn new(inner: Arc<dyn SessionLauncher>) -> Self {
        Self {
            inner,
            session: Mutex::new(None),
        }
    }

    /// Close the underlying session if one was launched
    pub async fn shutdown(&self) -> Result<()> {
        let session = self.session.lock().await.take();
        match session {
            Some(session) => {
                debug!("closing shared browser session");
                session.close().await
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SessionLauncher for SharedSessionLauncher {
    async fn launch(&self) -> Result<Box<dyn Session>> {
        let mut guard = self.session.lock().await;
        let session = match guard.as_ref() {
            Some(session) => session.clone(),
            None => {
                let session: Arc<dyn Session> = Arc::from(self.inner.launch().await?);
                *guard = Some(session.clone());
                session
            }
        };
        Ok(Box::new(LeasedSession { session }))
    }
}

struct LeasedSession {
    session: Arc<dyn Session>,
}

#[async_trait]
impl Session for LeasedSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.session.navigate(url).await
    }

    fn page(&self) -> &dyn Page {
        self.session.page()
    }

    async fn run_interactive_picker(&self) -> Result<PickerSelection> {
        self.session.run_interactive_picker().await
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
