use crate::{Arg, WampDict};
use crate::options::option::{OptionBuilder, WampOption};

/// Base struct for storing WampDict value
pub struct CallOptionItem(Option<WampDict>);

impl CallOptionItem {
    /// `options.timeout`: router-enforced timeout in milliseconds. `0` disables it.
    pub fn with_timeout(&self, timeout_ms: u64) -> Self {
        self.with_option(WampOption::CallOption("timeout".to_owned(), Arg::UInt(timeout_ms)))
    }

    /// `options.disclose_me`: ask the router to reveal our session id to the callee.
    pub fn with_disclose_me(&self, disclose: bool) -> Self {
        self.with_option(WampOption::CallOption("disclose_me".to_owned(), Arg::Bool(disclose)))
    }

    /// `options.receive_progress`: the caller accepts progressive results.
    pub fn with_receive_progress(&self, receive_progress: bool) -> Self {
        self.with_option(WampOption::CallOption("receive_progress".to_owned(), Arg::Bool(receive_progress)))
    }

    /// A resource key used by the router to bucket calls for load distribution.
    pub fn with_resource_key<T: Into<String>>(&self, key: T) -> Self {
        self.with_option(WampOption::CallOption("rkey".to_owned(), Arg::String(key.into())))
    }

    pub fn receive_progress(&self) -> bool {
        matches!(
            self.get_dict().and_then(|d| d.get("receive_progress").cloned()),
            Some(Arg::Bool(true))
        )
    }
}

impl OptionBuilder for CallOptionItem {
    fn create(options: Option<WampDict>) -> Self where Self: OptionBuilder + Sized {
        Self(options)
    }
    fn get_dict(&self) -> Option<WampDict> {
        self.0.clone()
    }
}

impl Default for CallOptionItem {
    fn default() -> Self {
        Self::empty()
    }
}

/// Alias for CallOptionItem
pub type CallOptions = CallOptionItem;
