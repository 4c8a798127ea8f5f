//! Fire-and-forget mail notifications.
//!
//! When a meeting request is created, the receiver gets one best-effort
//! email. The workflow hands the request to a dedicated worker task over a
//! channel and never waits for delivery; a failed send is visible only in
//! the logs, never in the API response.
//!
//! Delivery goes through an HTTP mail relay configured via `MAIL_API_URL`.
//! When no relay is configured the rendered message is logged instead,
//! which is the development default.

use tokio::sync::mpsc;

use crate::{
    config::Config,
    models::{meeting::MeetingRequest, time_slot::TimeSlot},
};

/// Mail delivery settings, validated at startup.
#[derive(Debug, Clone)]
pub struct MailConfig {
    api_url: Option<url::Url>,
    from_address: String,
}

impl MailConfig {
    /// Build mail settings from application configuration.
    ///
    /// Fails fast on a malformed `MAIL_API_URL` rather than discovering it
    /// on the first delivery attempt.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_url = config
            .mail_api_url
            .as_deref()
            .map(url::Url::parse)
            .transpose()
            .map_err(|e| anyhow::anyhow!("invalid MAIL_API_URL: {e}"))?;

        Ok(Self {
            api_url,
            from_address: config.mail_from.clone(),
        })
    }
}

/// Handle for enqueueing notifications.
///
/// Cloneable and cheap; the sending half of an unbounded channel whose
/// receiving half is owned by the worker task spawned in [`Notifier::spawn`].
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<MeetingRequest>,
}

impl Notifier {
    /// Start the delivery worker and return a handle to it.
    pub fn spawn(config: MailConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(deliver_loop(rx, config));

        Self { tx }
    }

    /// Notifier whose queue is inspected directly instead of delivered.
    #[cfg(test)]
    pub fn test_pair() -> (Self, mpsc::UnboundedReceiver<MeetingRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue exactly one notification for a freshly created request.
    ///
    /// Never blocks and never fails the caller; if the worker is gone the
    /// message is dropped with a log line.
    pub fn notify_request_created(&self, request: &MeetingRequest) {
        if self.tx.send(request.clone()).is_err() {
            tracing::warn!(
                request_id = %request.id,
                "notification worker is gone; dropping meeting request mail"
            );
        }
    }
}

/// Worker loop: one delivery attempt per queued request, failures logged.
async fn deliver_loop(mut rx: mpsc::UnboundedReceiver<MeetingRequest>, config: MailConfig) {
    let client = match reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("failed to build mail HTTP client: {e}");
            return;
        }
    };

    while let Some(request) = rx.recv().await {
        if let Err(e) = deliver(&client, &config, &request).await {
            // Single attempt only; request creation already succeeded
            tracing::error!(
                request_id = %request.id,
                receiver = %request.receiver_email,
                "failed to send meeting request mail: {e}"
            );
        }
    }
}

async fn deliver(
    client: &reqwest::Client,
    config: &MailConfig,
    request: &MeetingRequest,
) -> Result<(), reqwest::Error> {
    let subject = format!("[Schedulia] Meeting request: {}", request.title);
    let body = render_body(request);

    let Some(api_url) = &config.api_url else {
        tracing::info!(
            receiver = %request.receiver_email,
            subject = %subject,
            "mail relay not configured; logging notification instead\n{body}"
        );
        return Ok(());
    };

    let response = client
        .post(api_url.clone())
        .json(&serde_json::json!({
            "from": config.from_address,
            "to": request.receiver_email,
            "subject": subject,
            "body": body,
        }))
        .send()
        .await?;

    response.error_for_status()?;
    tracing::info!(
        request_id = %request.id,
        receiver = %request.receiver_email,
        "meeting request mail sent"
    );

    Ok(())
}

/// Render the plain-text mail body for a new meeting request.
fn render_body(request: &MeetingRequest) -> String {
    let description = request
        .description
        .as_deref()
        .map(|d| format!("Description: {d}\n"))
        .unwrap_or_default();

    format!(
        "Hi!\n\n\
         {sender} has requested a meeting.\n\n\
         Title: {title}\n\
         {description}\n\
         Suggested times:\n\
         {slots}\n\n\
         To respond to the meeting request, please sign up through the following link:\n\
         https://schedulia.org/signup\n\n\
         Thank you.\n\
         Schedulia Team\n",
        sender = request.sender.name,
        title = request.title,
        slots = format_slots(&request.available_slots),
    )
}

/// Human-readable local range, one slot per line.
fn format_slots(slots: &[TimeSlot]) -> String {
    slots
        .iter()
        .map(|slot| format!("- {}", format_slot(slot)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_slot(slot: &TimeSlot) -> String {
    format!(
        "{} - {}",
        slot.start_time.format("%Y-%m-%d %H:%M"),
        slot.end_time.format("%H:%M")
    )
}
