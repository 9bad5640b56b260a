pub mod providers;

pub use providers::{
    FcmProvider, MockPushProvider, MulticastMessage, MulticastResponse, ProviderError,
    PushProvider, SendOutcome, ServiceAccountKey,
};
