use crate::ports::{ChatNotifier, GifSearch};
use common::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const NO_RECIPIENTS: &str = "No valid recipients provided";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendGifInput {
    /// One channel or user id.
    pub recipient: String,
    pub gif_url: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub recipient: String,
    pub ts: String,
}

pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct GiphyActivities {
    gifs: Arc<dyn GifSearch>,
    chat: Arc<dyn ChatNotifier>,
}

impl GiphyActivities {
    pub fn new(gifs: Arc<dyn GifSearch>, chat: Arc<dyn ChatNotifier>) -> Self {
        Self { gifs, chat }
    }

    /// Splits the comma-separated recipient list. Touches nothing remote.
    pub async fn resolve_recipients(&self, raw: String) -> AppResult<Vec<String>> {
        let recipients = parse_recipients(&raw);
        if recipients.is_empty() {
            return Err(AppError::Validation(NO_RECIPIENTS.to_string()));
        }
        Ok(recipients)
    }

    pub async fn fetch_gif(&self, query: String) -> AppResult<String> {
        if query.trim().is_empty() {
            return Err(AppError::Validation("gif query must not be empty".to_string()));
        }

        let urls = self.gifs.search(query.trim(), 1).await?;
        urls.into_iter()
            .next()
            .ok_or_else(|| AppError::remote(None, format!("no gif found for '{}'", query.trim())))
    }

    /// Posts to exactly one recipient, so a retry never repeats another delivery.
    pub async fn send_gif(&self, input: SendGifInput) -> AppResult<Delivery> {
        let recipient = input.recipient.trim();
        if recipient.is_empty() {
            return Err(AppError::Validation(NO_RECIPIENTS.to_string()));
        }

        let text = match input.message.as_deref().map(str::trim) {
            Some(message) if !message.is_empty() => format!("{}\n{}", message, input.gif_url),
            _ => input.gif_url.clone(),
        };

        let ts = self.chat.post_message(recipient, &text).await?;
        tracing::info!(recipient = %recipient, "Gif delivered");
        Ok(Delivery {
            recipient: recipient.to_string(),
            ts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MockChatNotifier, MockGifSearch};
    use mockall::predicate::eq;

    fn activities(gifs: MockGifSearch, chat: MockChatNotifier) -> GiphyActivities {
        GiphyActivities::new(Arc::new(gifs), Arc::new(chat))
    }

    #[test]
    fn parse_recipients_trims_and_drops_blanks() {
        assert_eq!(parse_recipients(" #a , ,#b,"), vec!["#a", "#b"]);
        assert!(parse_recipients("  ").is_empty());
    }

    #[tokio::test]
    async fn fetch_gif_returns_first_url() {
        let mut gifs = MockGifSearch::new();
        gifs.expect_search()
            .with(eq("cats"), eq(1))
            .times(1)
            .returning(|_, _| Ok(vec!["https://g/1.gif".into(), "https://g/2.gif".into()]));

        let url = activities(gifs, MockChatNotifier::new())
            .fetch_gif(" cats ".into())
            .await
            .unwrap();
        assert_eq!(url, "https://g/1.gif");
    }

    #[tokio::test]
    async fn fetch_gif_without_results_is_remote_error() {
        let mut gifs = MockGifSearch::new();
        gifs.expect_search().returning(|_, _| Ok(vec![]));

        let err = activities(gifs, MockChatNotifier::new())
            .fetch_gif("nothing".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Remote { status: None, .. }));
    }

    #[tokio::test]
    async fn empty_or_whitespace_recipients_are_rejected() {
        let giphy = activities(MockGifSearch::new(), MockChatNotifier::new());
        for recipients in ["", "   ", " , ,"] {
            match giphy.resolve_recipients(recipients.to_string()).await {
                Err(AppError::Validation(msg)) => assert_eq!(msg, NO_RECIPIENTS),
                other => panic!("unexpected result: {:?}", other),
            }
        }

        let resolved = giphy.resolve_recipients("#general, @ada".into()).await.unwrap();
        assert_eq!(resolved, vec!["#general", "@ada"]);
    }

    #[tokio::test]
    async fn send_gif_posts_once_to_one_recipient() {
        let mut chat = MockChatNotifier::new();
        chat.expect_post_message()
            .withf(|channel, text| channel == "@ada" && text == "Friday!\nhttps://g/1.gif")
            .times(1)
            .returning(|_, _| Ok("1.0".into()));

        let delivery = activities(MockGifSearch::new(), chat)
            .send_gif(SendGifInput {
                recipient: " @ada ".into(),
                gif_url: "https://g/1.gif".into(),
                message: Some("Friday!".into()),
            })
            .await
            .unwrap();
        assert_eq!(
            delivery,
            Delivery {
                recipient: "@ada".into(),
                ts: "1.0".into()
            }
        );
    }

    #[tokio::test]
    async fn send_gif_rejects_blank_recipient() {
        let mut chat = MockChatNotifier::new();
        chat.expect_post_message().never();

        let err = activities(MockGifSearch::new(), chat)
            .send_gif(SendGifInput {
                recipient: "  ".into(),
                gif_url: "https://g/1.gif".into(),
                message: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
