use tokio::sync::broadcast;

use crate::models::{SocialMediaEntry, TelegramLinks};

const CHANNEL_CAPACITY: usize = 16;

/// Typed in-process pub/sub between the data layer and rendering surfaces.
///
/// Plain fan-out: every subscriber gets every update, subscribers never
/// interfere with each other, and a lagging receiver drops oldest values
/// rather than blocking publishers.
#[derive(Clone)]
pub struct EventBus {
    links: broadcast::Sender<TelegramLinks>,
    shop_social: broadcast::Sender<Vec<SocialMediaEntry>>,
    language: broadcast::Sender<String>,
}

impl EventBus {
    pub fn new() -> Self {
        let (links, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (shop_social, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (language, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            links,
            shop_social,
            language,
        }
    }

    // A send error only means there are no subscribers right now, which is
    // normal for one-shot CLI invocations.

    pub fn publish_links(&self, links: TelegramLinks) {
        let _ = self.links.send(links);
    }

    pub fn publish_shop_social(&self, list: Vec<SocialMediaEntry>) {
        let _ = self.shop_social.send(list);
    }

    pub fn publish_language(&self, code: String) {
        let _ = self.language.send(code);
    }

    pub fn subscribe_links(&self) -> broadcast::Receiver<TelegramLinks> {
        self.links.subscribe()
    }

    pub fn subscribe_shop_social(&self) -> broadcast::Receiver<Vec<SocialMediaEntry>> {
        self.shop_social.subscribe()
    }

    pub fn subscribe_language(&self) -> broadcast::Receiver<String> {
        self.language.subscribe()
    }

    /// Sender for the links channel; the poller publishes through this.
    pub(crate) fn links_sender(&self) -> broadcast::Sender<TelegramLinks> {
        self.links.clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fan_out_reaches_every_subscriber() {
        let bus = EventBus::new();
        let mut a = bus.subscribe_links();
        let mut b = bus.subscribe_links();

        let links = TelegramLinks::default();
        bus.publish_links(links.clone());

        assert_eq!(a.recv().await.unwrap(), links);
        assert_eq!(b.recv().await.unwrap(), links);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish_language("fr".to_string());
    }
}
