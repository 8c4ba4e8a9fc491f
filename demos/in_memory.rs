//! Minimal end-to-end demo against an in-memory "broker".
//!
//! Run with: `cargo run --example in_memory`

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fetchpool::{
    BatchProcessor, BrokerConsumer, BrokerError, ConsumerFactory, PollEngine, SourceBuilder,
    TopicSelector,
};

/// Shared queue standing in for a broker partition.
type Partition = Arc<Mutex<VecDeque<String>>>;

struct QueueConsumer {
    partition: Partition,
}

#[async_trait]
impl BrokerConsumer for QueueConsumer {
    type Record = String;

    fn subscribe(&mut self, selector: &TopicSelector) -> Result<(), BrokerError> {
        println!("consumer subscribed: {}", selector.describe());
        Ok(())
    }

    async fn poll(&mut self, timeout: Duration) -> Result<Vec<String>, BrokerError> {
        let batch: Vec<String> = {
            let mut partition = self.partition.lock().unwrap();
            partition.drain(..).collect()
        };
        if batch.is_empty() {
            tokio::time::sleep(timeout).await;
        }
        Ok(batch)
    }
}

struct QueueFactory {
    partition: Partition,
}

impl ConsumerFactory for QueueFactory {
    type Consumer = QueueConsumer;

    fn create_consumer(&self, group_id: &str) -> Result<QueueConsumer, BrokerError> {
        println!("consumer created for group {group_id:?}");
        Ok(QueueConsumer {
            partition: Arc::clone(&self.partition),
        })
    }
}

struct Printer;

#[async_trait]
impl BatchProcessor<String> for Printer {
    async fn on_batch(&self, batch: &[String]) {
        println!("delivered batch: {batch:?}");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let partition: Partition = Arc::new(Mutex::new(VecDeque::new()));

    let source = SourceBuilder::new()
        .topics(["demo-topic"])
        .group_id("demo-group")
        .consumer_factory(Arc::new(QueueFactory {
            partition: Arc::clone(&partition),
        }))
        .fetch_engine(Arc::new(PollEngine::new()))
        .converter(Arc::new(|record: String| Some(record)))
        .poll_timeout(Duration::from_millis(20))
        .auto_start()
        .build()?;

    let registration = source.subscribe(Arc::new(Printer));

    for i in 0..3 {
        partition
            .lock()
            .unwrap()
            .extend((0..4).map(|j| format!("record-{i}-{j}")));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    registration.cancel();
    Ok(())
}
