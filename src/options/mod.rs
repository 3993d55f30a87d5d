pub mod option;
pub mod subscription;
pub mod call;
pub mod publish;
pub mod register;

pub use option::{OptionBuilder, WampOption};
pub use subscription::SubscribeOptions;
pub use call::CallOptions;
pub use publish::PublishOptions;
pub use register::RegisterOptions;
