use std::sync::Arc;

use dispatcher::Dispatcher;
use ed25519_dalek::VerifyingKey;

pub(crate) struct AppState {
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) verifying_key: VerifyingKey,
}
