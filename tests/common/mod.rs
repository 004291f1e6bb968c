#![allow(dead_code)]

use std::sync::{Arc, Once};

use ssz_view::tree::{sha256_pair, Node, Root};
use ssz_view::view::View;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Route library logs to the test harness; `RUST_LOG` picks the level.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn root_of(view: &impl View) -> Root {
    view.backing().merkle_root(sha256_pair)
}

pub fn leaf(value: u64) -> Arc<Node> {
    Node::leaf(Root::from_u64(value))
}

/// Deterministic bit pattern, mixing runs and alternation.
pub fn pattern(len: usize) -> Vec<bool> {
    (0..len).map(|i| (i * 7 + i / 5) % 3 == 0).collect()
}
