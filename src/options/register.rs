use crate::{Arg, WampDict};
use crate::options::option::{OptionBuilder, WampOption};

/// Base struct for storing WampDict value
pub struct RegisterOptionItem(Option<WampDict>);

impl RegisterOptionItem {
    /// Add an option for pattern matching the procedure of the registration
    pub fn with_match(&self, match_option: &str) -> Self {
        self.with_option(WampOption::RegisterOption("match".to_owned(), Arg::String(match_option.to_owned())))
    }

    /// `options.invoke`: shared-registration strategy (`single`, `roundrobin`, `random`, `first`, `last`).
    pub fn with_invoke(&self, invoke: &str) -> Self {
        self.with_option(WampOption::RegisterOption("invoke".to_owned(), Arg::String(invoke.to_owned())))
    }
}

impl OptionBuilder for RegisterOptionItem {
    fn create(options: Option<WampDict>) -> Self where Self: OptionBuilder + Sized {
        Self(options)
    }
    fn get_dict(&self) -> Option<WampDict> {
        self.0.clone()
    }
}

impl Default for RegisterOptionItem {
    fn default() -> Self {
        Self::empty()
    }
}

/// Alias for RegisterOptionItem
pub type RegisterOptions = RegisterOptionItem;
