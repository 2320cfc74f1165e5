//! Exchange-address tagging (C4 flow classification input). Injected rather
//! than baked in — spec.md §4.4: "The tag-set is injected; absence simply
//! leaves flow classification as unknown... accepted as a quality-of-signal
//! issue, not an error."

/// Answers whether an address is known to belong to an exchange-like
/// entity. Implementations may be empty, static, or backed by a live
/// lookup; C4 treats "unknown" the same as "not tagged".
pub trait AddressTagSource: Send + Sync {
    fn is_exchange_like(&self, address: &str) -> bool;
}

/// Default tag source: nothing is tagged. Used when no real tag-set is
/// wired in; flow classification degrades to `unknown` for most
/// transactions, which is an accepted quality-of-signal limitation.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyTagSource;

impl AddressTagSource for EmptyTagSource {
    fn is_exchange_like(&self, _address: &str) -> bool {
        false
    }
}

/// A fixed in-memory tag-set, for tests and for hosts that maintain their
/// own exchange address lists.
#[derive(Debug, Default, Clone)]
pub struct StaticTagSource {
    exchange_addresses: std::collections::HashSet<String>,
}

impl StaticTagSource {
    pub fn new(exchange_addresses: impl IntoIterator<Item = String>) -> Self {
        StaticTagSource {
            exchange_addresses: exchange_addresses.into_iter().collect(),
        }
    }
}

impl AddressTagSource for StaticTagSource {
    fn is_exchange_like(&self, address: &str) -> bool {
        self.exchange_addresses.contains(address)
    }
}
