//! Black/white-list restricting PUBLISH delivery to a subset of session
//! receivers, grounded on the reference implementation's `bwlist` module.

use crate::message::{Arg, WampDict, WampId};

fn add_unique_sorted<T: PartialOrd + Clone>(list: &mut Option<Vec<T>>, value: T) {
    let v = list.get_or_insert_with(Vec::new);
    match v.binary_search_by(|x| x.partial_cmp(&value).unwrap_or(std::cmp::Ordering::Equal)) {
        Ok(_) => {}
        Err(pos) => v.insert(pos, value),
    }
}

/// A receiver of a PUBLISH, identified by session id, auth id and auth role.
#[derive(Clone, Debug, Default)]
pub struct Receiver {
    pub id: Option<WampId>,
    pub auth_id: Option<String>,
    pub auth_role: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct BlackWhiteList {
    excluded_ids: Option<Vec<WampId>>,
    excluded_auth_ids: Option<Vec<String>>,
    excluded_auth_roles: Option<Vec<String>>,
    eligible_ids: Option<Vec<WampId>>,
    eligible_auth_ids: Option<Vec<String>>,
    eligible_auth_roles: Option<Vec<String>>,
}

impl BlackWhiteList {
    pub fn new() -> BlackWhiteList {
        BlackWhiteList::default()
    }

    pub fn exclude_id(mut self, id: WampId) -> Self {
        add_unique_sorted(&mut self.excluded_ids, id);
        self
    }
    pub fn exclude_auth_id<T: Into<String>>(mut self, auth_id: T) -> Self {
        add_unique_sorted(&mut self.excluded_auth_ids, auth_id.into());
        self
    }
    pub fn exclude_auth_role<T: Into<String>>(mut self, auth_role: T) -> Self {
        add_unique_sorted(&mut self.excluded_auth_roles, auth_role.into());
        self
    }
    pub fn eligible_id(mut self, id: WampId) -> Self {
        add_unique_sorted(&mut self.eligible_ids, id);
        self
    }
    pub fn eligible_auth_id<T: Into<String>>(mut self, auth_id: T) -> Self {
        add_unique_sorted(&mut self.eligible_auth_ids, auth_id.into());
        self
    }
    pub fn eligible_auth_role<T: Into<String>>(mut self, auth_role: T) -> Self {
        add_unique_sorted(&mut self.eligible_auth_roles, auth_role.into());
        self
    }

    fn is_excluded(&self, r: &Receiver) -> bool {
        contains_if_not_none(&self.excluded_ids, &r.id)
            || contains_opt_str(&self.excluded_auth_ids, &r.auth_id)
            || contains_opt_str(&self.excluded_auth_roles, &r.auth_role)
    }

    fn is_eligible(&self, r: &Receiver) -> bool {
        let has_eligible_lists =
            self.eligible_ids.is_some() || self.eligible_auth_ids.is_some() || self.eligible_auth_roles.is_some();
        if !has_eligible_lists {
            return true;
        }
        contains_if_not_none(&self.eligible_ids, &r.id)
            || contains_opt_str(&self.eligible_auth_ids, &r.auth_id)
            || contains_opt_str(&self.eligible_auth_roles, &r.auth_role)
    }

    /// `r ∈ bwlist ⇔ is_eligible(r) ∧ ¬is_excluded(r)`
    pub fn contains(&self, r: &Receiver) -> bool {
        self.is_eligible(r) && !self.is_excluded(r)
    }

    pub fn is_empty(&self) -> bool {
        self.excluded_ids.is_none()
            && self.excluded_auth_ids.is_none()
            && self.excluded_auth_roles.is_none()
            && self.eligible_ids.is_none()
            && self.eligible_auth_ids.is_none()
            && self.eligible_auth_roles.is_none()
    }

    /// Encodes this bwlist into the six optional PUBLISH option keys.
    pub fn to_options(&self, options: &mut WampDict) {
        if let Some(v) = &self.excluded_ids {
            options.insert("exclude".into(), Arg::List(v.iter().map(|i| Arg::UInt(*i)).collect()));
        }
        if let Some(v) = &self.excluded_auth_ids {
            options.insert(
                "exclude_authid".into(),
                Arg::List(v.iter().map(|s| Arg::String(s.clone())).collect()),
            );
        }
        if let Some(v) = &self.excluded_auth_roles {
            options.insert(
                "exclude_authrole".into(),
                Arg::List(v.iter().map(|s| Arg::String(s.clone())).collect()),
            );
        }
        if let Some(v) = &self.eligible_ids {
            options.insert("eligible".into(), Arg::List(v.iter().map(|i| Arg::UInt(*i)).collect()));
        }
        if let Some(v) = &self.eligible_auth_ids {
            options.insert(
                "eligible_authid".into(),
                Arg::List(v.iter().map(|s| Arg::String(s.clone())).collect()),
            );
        }
        if let Some(v) = &self.eligible_auth_roles {
            options.insert(
                "eligible_authrole".into(),
                Arg::List(v.iter().map(|s| Arg::String(s.clone())).collect()),
            );
        }
    }
}

fn contains_if_not_none<T: PartialEq>(list: &Option<Vec<T>>, value: &Option<T>) -> bool {
    match (list, value) {
        (Some(l), Some(v)) => l.contains(v),
        _ => false,
    }
}

fn contains_opt_str(list: &Option<Vec<String>>, value: &Option<String>) -> bool {
    match (list, value) {
        (Some(l), Some(v)) => l.iter().any(|x| x == v),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receiver(id: WampId, auth_id: &str, auth_role: &str) -> Receiver {
        Receiver {
            id: Some(id),
            auth_id: Some(auth_id.to_owned()),
            auth_role: Some(auth_role.to_owned()),
        }
    }

    #[test]
    fn empty_bwlist_admits_everyone() {
        let bwlist = BlackWhiteList::new();
        assert!(bwlist.contains(&receiver(1, "alice", "user")));
    }

    #[test]
    fn exclusion_wins_even_if_eligible() {
        let bwlist = BlackWhiteList::new().eligible_id(1).exclude_id(1);
        assert!(!bwlist.contains(&receiver(1, "alice", "user")));
    }

    #[test]
    fn eligible_list_restricts_to_named_members() {
        let bwlist = BlackWhiteList::new().eligible_auth_role("admin");
        assert!(bwlist.contains(&receiver(2, "bob", "admin")));
        assert!(!bwlist.contains(&receiver(3, "carol", "user")));
    }

    #[test]
    fn encodes_sorted_unique_ids_into_options() {
        let bwlist = BlackWhiteList::new().exclude_id(5).exclude_id(1).exclude_id(5);
        let mut options = WampDict::new();
        bwlist.to_options(&mut options);
        assert_eq!(
            options.get("exclude"),
            Some(&Arg::List(vec![Arg::UInt(1), Arg::UInt(5)]))
        );
    }
}
