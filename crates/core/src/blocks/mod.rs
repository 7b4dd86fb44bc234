mod producer;

pub use producer::{BlockProducer, BlockStream, BlockStreamItem, BoxBlockStream, advancing};
