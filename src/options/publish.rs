use crate::{Arg, WampDict};
use crate::options::option::{OptionBuilder, WampOption};
use crate::bwlist::BlackWhiteList;

/// Base struct for storing WampDict value
pub struct PublishOptionItem(Option<WampDict>);

impl PublishOptionItem {
    /// `options.acknowledge`: ask the router to confirm the publication with a PUBLISHED reply.
    pub fn with_acknowledge(&self, acknowledge: bool) -> Self {
        self.with_option(WampOption::PublishOption("acknowledge".to_owned(), Arg::Bool(acknowledge)))
    }

    /// `options.exclude_me`: whether the publisher itself should receive this event if subscribed.
    pub fn with_exclude_me(&self, exclude_me: bool) -> Self {
        self.with_option(WampOption::PublishOption("exclude_me".to_owned(), Arg::Bool(exclude_me)))
    }

    /// `options.disclose_me`: ask the router to reveal our session id to subscribers.
    pub fn with_disclose_me(&self, disclose: bool) -> Self {
        self.with_option(WampOption::PublishOption("disclose_me".to_owned(), Arg::Bool(disclose)))
    }

    /// Merges a black/white-list's six option keys into this option set.
    pub fn with_bwlist(&self, bwlist: &BlackWhiteList) -> Self {
        let mut dict = self.get_dict().unwrap_or_default();
        bwlist.to_options(&mut dict);
        Self::create(Some(dict))
    }
}

impl OptionBuilder for PublishOptionItem {
    fn create(options: Option<WampDict>) -> Self where Self: OptionBuilder + Sized {
        Self(options)
    }
    fn get_dict(&self) -> Option<WampDict> {
        self.0.clone()
    }
}

impl Default for PublishOptionItem {
    fn default() -> Self {
        Self::empty()
    }
}

/// Alias for PublishOptionItem
pub type PublishOptions = PublishOptionItem;
