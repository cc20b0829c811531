//! Channel sections: a producer/consumer relay and a first-deal-wins race.

use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Sends `0..count` through a channel of the given capacity and returns
/// what the consumer received, in order.
///
/// The consumer sleeps `work` after every value, so a small capacity makes
/// the producer wait for the consumer.
pub async fn relay(count: usize, capacity: usize, work: Duration) -> Vec<usize> {
    let (tx, mut rx) = mpsc::channel(capacity.max(1));

    let producer = tokio::spawn(async move {
        for value in 0..count {
            if tx.send(value).await.is_err() {
                break;
            }
        }
        // tx dropped here, which closes the channel
    });

    let mut received = Vec::with_capacity(count);
    while let Some(value) = rx.recv().await {
        println!("   {}", value);
        received.push(value);
        if !work.is_zero() {
            tokio::time::sleep(work).await;
        }
    }

    if let Err(e) = producer.await {
        warn!("Producer task failed: {}", e);
    }

    received
}

/// Products the price watchers look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Chicken,
    Tofu,
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Product::Chicken => write!(f, "chicken"),
            Product::Tofu => write!(f, "tofu"),
        }
    }
}

/// A price at or under the product's maximum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deal {
    pub product: Product,
    pub website: String,
}

/// Produces the current price of a product on a website.
pub type PriceSource = Arc<dyn Fn(&str, Product) -> f32 + Send + Sync>;

/// Uniformly random prices in `[0, ceiling)`.
pub fn random_prices(ceiling: f32) -> PriceSource {
    Arc::new(move |_: &str, _: Product| rand::thread_rng().gen::<f32>() * ceiling)
}

/// Settings for one race between price watchers.
#[derive(Clone)]
pub struct DealWatch {
    pub websites: Vec<String>,
    pub max_chicken_price: f32,
    pub max_tofu_price: f32,
    pub poll_interval: Duration,
    pub give_up_after: Duration,
    pub prices: PriceSource,
}

impl DealWatch {
    fn max_price(&self, product: Product) -> f32 {
        match product {
            Product::Chicken => self.max_chicken_price,
            Product::Tofu => self.max_tofu_price,
        }
    }
}

/// Spawns a chicken and a tofu watcher per website and returns the first
/// deal any of them reports. Losing watchers are cancelled.
///
/// Returns `None` when there is nothing to watch or no deal shows up
/// before `give_up_after`.
pub async fn find_first_deal(watch: &DealWatch) -> Option<Deal> {
    let capacity = watch.websites.len().max(1);
    let (chicken_tx, mut chicken_rx) = mpsc::channel::<String>(capacity);
    let (tofu_tx, mut tofu_rx) = mpsc::channel::<String>(capacity);

    let mut watchers = JoinSet::new();
    for website in &watch.websites {
        for (product, tx) in [(Product::Chicken, &chicken_tx), (Product::Tofu, &tofu_tx)] {
            watchers.spawn(watch_price(
                website.clone(),
                product,
                watch.max_price(product),
                watch.poll_interval,
                Arc::clone(&watch.prices),
                tx.clone(),
            ));
        }
    }
    drop(chicken_tx);
    drop(tofu_tx);

    let race = async {
        tokio::select! {
            Some(website) = chicken_rx.recv() => Some(Deal { product: Product::Chicken, website }),
            Some(website) = tofu_rx.recv() => Some(Deal { product: Product::Tofu, website }),
            else => None,
        }
    };

    let deal = tokio::time::timeout(watch.give_up_after, race)
        .await
        .unwrap_or_else(|_| {
            warn!("No deal found within {:?}", watch.give_up_after);
            None
        });

    watchers.abort_all();
    deal
}

async fn watch_price(
    website: String,
    product: Product,
    max_price: f32,
    poll_interval: Duration,
    prices: PriceSource,
    tx: mpsc::Sender<String>,
) {
    loop {
        tokio::time::sleep(poll_interval).await;
        let price = prices(website.as_str(), product);
        debug!("{} on {}: {:.2}", product, website, price);

        if price <= max_price {
            // The race may already be over; a closed channel is fine.
            let _ = tx.send(website).await;
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watch(websites: &[&str], prices: PriceSource) -> DealWatch {
        DealWatch {
            websites: websites.iter().map(|s| s.to_string()).collect(),
            max_chicken_price: 5.0,
            max_tofu_price: 3.0,
            poll_interval: Duration::from_millis(5),
            give_up_after: Duration::from_secs(2),
            prices,
        }
    }

    #[tokio::test]
    async fn test_relay_unbuffered_in_order() {
        let received = relay(5, 1, Duration::ZERO).await;
        assert_eq!(received, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_relay_buffered_with_work() {
        let received = relay(4, 4, Duration::from_millis(2)).await;
        assert_eq!(received, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_relay_nothing_to_send() {
        assert!(relay(0, 0, Duration::ZERO).await.is_empty());
    }

    #[tokio::test]
    async fn test_first_deal_wins() {
        let prices: PriceSource = Arc::new(|website: &str, product: Product| -> f32 {
            match (website, product) {
                ("costco.com", Product::Tofu) => 1.0,
                _ => 19.0,
            }
        });

        let deal = find_first_deal(&watch(&["walmart.com", "costco.com"], prices)).await;
        assert_eq!(
            deal,
            Some(Deal {
                product: Product::Tofu,
                website: "costco.com".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_tofu_uses_its_own_maximum() {
        // 4.0 is a chicken deal but not a tofu deal.
        let prices: PriceSource = Arc::new(|_: &str, _: Product| -> f32 { 4.0 });

        let deal = find_first_deal(&watch(&["walmart.com"], prices)).await;
        assert_eq!(deal.map(|d| d.product), Some(Product::Chicken));
    }

    #[tokio::test]
    async fn test_no_websites_no_deal() {
        assert_eq!(find_first_deal(&watch(&[], random_prices(20.0))).await, None);
    }

    #[tokio::test]
    async fn test_gives_up_without_deal() {
        let mut settings = watch(&["walmart.com"], Arc::new(|_: &str, _: Product| -> f32 { 100.0 }));
        settings.give_up_after = Duration::from_millis(30);
        assert_eq!(find_first_deal(&settings).await, None);
    }
}
