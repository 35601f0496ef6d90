//! User-facing notices.
//!
//! Success and error notices travel on separate channels, so a consumer can
//! show a confirmation without it being mistaken for (or overwriting) an
//! error message.

use serde::Serialize;
use tokio::sync::mpsc;

use storefront_products::ProductId;

use crate::error::Operation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub operation: Operation,
    pub product_id: Option<ProductId>,
    pub message: String,
}

impl Notice {
    pub fn new(
        operation: Operation,
        product_id: Option<ProductId>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            product_id,
            message: message.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn success(&self, notice: Notice);

    fn error(&self, notice: Notice);
}

/// Logs notices instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, notice: Notice) {
        tracing::info!(operation = %notice.operation, product_id = ?notice.product_id, "{}", notice.message);
    }

    fn error(&self, notice: Notice) {
        tracing::warn!(operation = %notice.operation, product_id = ?notice.product_id, "{}", notice.message);
    }
}

/// Receiving ends of a [`ChannelNotifier`].
#[derive(Debug)]
pub struct NoticeReceivers {
    pub success: mpsc::UnboundedReceiver<Notice>,
    pub error: mpsc::UnboundedReceiver<Notice>,
}

/// Delivers notices on two unbounded tokio channels.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    success: mpsc::UnboundedSender<Notice>,
    error: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, NoticeReceivers) {
        let (success_tx, success_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        (
            Self {
                success: success_tx,
                error: error_tx,
            },
            NoticeReceivers {
                success: success_rx,
                error: error_rx,
            },
        )
    }
}

impl Notifier for ChannelNotifier {
    fn success(&self, notice: Notice) {
        if self.success.send(notice).is_err() {
            tracing::debug!("success notice dropped: receiver closed");
        }
    }

    fn error(&self, notice: Notice) {
        if self.error.send(notice).is_err() {
            tracing::debug!("error notice dropped: receiver closed");
        }
    }
}
