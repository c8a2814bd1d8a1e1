use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store lock poisoned: {0}")]
    Poisoned(&'static str),

    #[error("unknown index `{index}` on {store}")]
    UnknownIndex {
        store: &'static str,
        index: &'static str,
    },
}
