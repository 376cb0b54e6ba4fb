use super::{MonitorApp, ShutdownReason};
use crate::error::{MaskguardError, Result};
use crate::events::{EventFilter, EventReceiver, MonitorEvent};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::{error, info, warn};

impl MonitorApp {
    /// Dispatch bus commands until a signal or a quit command arrives, then
    /// shut down. Returns the exit code.
    pub async fn run(&mut self) -> Result<i32> {
        info!("MaskGuard monitor is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| MaskguardError::system("Shutdown sender already taken"))?;

        let mut shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| MaskguardError::system("Shutdown receiver already taken"))?;

        self.setup_signal_handlers(shutdown_sender);

        let mut commands = EventReceiver::new(&self.event_bus, EventFilter::Commands, "monitor");

        let shutdown_reason = loop {
            tokio::select! {
                reason = &mut shutdown_receiver => {
                    break reason.map_err(|_| {
                        MaskguardError::system("Shutdown channel closed unexpectedly")
                    })?;
                }
                command = commands.recv() => match command {
                    Ok(MonitorEvent::ShutdownRequested { reason }) => {
                        break ShutdownReason::UserRequest(reason);
                    }
                    Ok(command) => self.handle_command(command).await,
                    Err(e) => {
                        error!("Command channel failed: {}", e);
                        break ShutdownReason::Error(e.to_string());
                    }
                },
            }
        };

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let exit_code = self.shutdown().await?;

        info!("MaskGuard monitor shutdown complete");
        Ok(exit_code)
    }

    /// Set up signal handlers for graceful shutdown
    fn setup_signal_handlers(&self, shutdown_sender: oneshot::Sender<ShutdownReason>) {
        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));

        // Handle SIGTERM - Unix only
        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = Arc::clone(&shutdown_sender);
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };

                if let Some(()) = sigterm.recv().await {
                    info!("Received SIGTERM signal");
                    if let Some(sender) = shutdown_sender_sigterm.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
                    }
                }
            });
        }

        // Handle SIGINT (Ctrl+C) - Cross-platform
        let shutdown_sender_sigint = Arc::clone(&shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                if let Some(sender) = shutdown_sender_sigint.lock().await.take() {
                    let _ = sender.send(ShutdownReason::Signal("SIGINT".to_string()));
                }
            }
        });
    }
}
