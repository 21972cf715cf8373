mod retry;
mod secret_cache;
mod webhook_signature;

pub use retry::{poll_until, Delay, PollPolicy, TokioDelay};
pub use secret_cache::SecretCache;
pub use webhook_signature::{calculate_signature, verify_signature, WebhookSignatureError};
