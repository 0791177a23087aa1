//! Outbound delivery of detected values

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::NotifyError;
use crate::pipeline::DetectionEvent;
use crate::NotifyConfig;

/// Delivery channel for detected values (mail, push, ...)
pub trait NotificationSink: Send + Sync + 'static {
    fn send(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Sink that only logs what would have been delivered
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn send(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send {
        info!(?recipients, subject, body, "Notification sent");
        async { Ok(()) }
    }
}

/// Fire-and-forget dispatch of detection events to a sink.
///
/// Each send runs on its own task. Failures are logged and counted, never
/// retried and never reported back to the caller.
pub struct Notifier<S> {
    sink: Arc<S>,
    recipients: Arc<[String]>,
    subject: Arc<str>,
}

impl<S> Clone for Notifier<S> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
            recipients: self.recipients.clone(),
            subject: self.subject.clone(),
        }
    }
}

impl<S: NotificationSink> Notifier<S> {
    pub fn new(sink: Arc<S>, config: &NotifyConfig) -> Self {
        Self {
            sink,
            recipients: config.recipients.clone().into(),
            subject: config.subject.as_str().into(),
        }
    }

    pub fn notify(&self, event: &DetectionEvent) {
        if self.recipients.is_empty() {
            debug!(value = %event.value, "No recipients, skipping notification");
            return;
        }

        let sink = self.sink.clone();
        let recipients = self.recipients.clone();
        let subject = self.subject.clone();
        let body = event.value.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.send(&recipients, &subject, &body).await {
                error!("Failed to deliver notification for {}: {}", body, e);
                metrics::counter!("notifications_failed").increment(1);
            }
        });
    }
}
