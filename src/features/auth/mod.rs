/// 認証機能のモジュール
pub mod gate;
pub mod local;
pub mod models;
pub mod remote;
pub mod session;
pub mod storage;

pub use gate::{validate_credentials, AuthGate};
pub use local::LocalAuthGate;
pub use models::*;
pub use remote::RemoteAuthGate;
pub use session::{SessionObservable, SessionSubscription};
pub use storage::SessionFile;
