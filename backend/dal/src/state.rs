use std::sync::Arc;

use tally::BackingStore;

pub struct DalState {
    pub store: Arc<dyn BackingStore>,
    pub access_token: String,
}

impl DalState {
    pub fn new(store: Arc<dyn BackingStore>, access_token: String) -> Arc<Self> {
        Arc::new(Self {
            store,
            access_token,
        })
    }
}
