// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal handling for interactive runs.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C) that trigger a
//! [`CancellationToken`]. The agent loop watches the token and stops the
//! in-flight dispatch; the handler never touches the session.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        if wait_for_signal().await {
            token_clone.cancel();
            debug!("cancellation signal handler completed");
        }
    });

    token
}

/// Resolves once a signal arrives. Returns false if no handler could be installed.
async fn wait_for_signal() -> bool {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => {
                        if let Err(e) = res {
                            warn!(error = %e, "failed to listen for Ctrl+C");
                            return false;
                        }
                        info!("received SIGINT (Ctrl+C), cancelling");
                    }
                    _ = sigterm.recv() => {
                        info!("received SIGTERM, cancelling");
                    }
                }
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler, listening for Ctrl+C only");
                ctrl_c().await
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await
    }
}

async fn ctrl_c() -> bool {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("received Ctrl+C, cancelling");
            true
        }
        Err(e) => {
            warn!(error = %e, "failed to listen for Ctrl+C");
            false
        }
    }
}
