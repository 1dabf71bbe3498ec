//! Contact deduplication within one contacts pass.

use std::collections::HashMap;

use tracing::trace;

use crate::contact::Contact;
use crate::message::Platform;

/// Collapses repeated sightings of the same identity into one [`Contact`].
///
/// Contacts are keyed on `(platform, id)` of their first identity. The first
/// sighting is stored as is; later sightings never replace its identities or
/// overwrite its name.
///
/// A stored name is set once and never overwritten, and an empty name counts
/// as not yet set: it is filled in from the first later sighting that has one.
/// When the first sighting carries a name this is plain first-write-wins.
///
/// # Example
///
/// ```rust
/// use chatarchive::core::ContactDeduplicator;
/// use chatarchive::{Contact, Platform, PlatformIdentity};
///
/// let mut dedup = ContactDeduplicator::new();
/// dedup.observe(Contact::new("Alice", PlatformIdentity::new("123", Platform::Icq)));
/// dedup.observe(Contact::new("Alice A.", PlatformIdentity::new("123", Platform::Icq)));
///
/// let contacts = dedup.finalize();
/// assert_eq!(contacts.len(), 1);
/// assert_eq!(contacts[0].name, "Alice");
/// ```
#[derive(Debug, Default)]
pub struct ContactDeduplicator {
    index: HashMap<(Platform, String), usize>,
    contacts: Vec<Contact>,
}

impl ContactDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one sighting. Returns `true` if it introduced a new contact.
    pub fn observe(&mut self, candidate: Contact) -> bool {
        let (platform, id) = candidate.primary().key();
        let key = (platform, id.to_string());

        if let Some(&slot) = self.index.get(&key) {
            let stored = &mut self.contacts[slot];
            if stored.fill_name(&candidate.name) {
                trace!(platform = %platform, id = %key.1, "filled in contact name");
            }
            return false;
        }

        self.index.insert(key, self.contacts.len());
        self.contacts.push(candidate);
        true
    }

    /// Number of distinct contacts seen so far.
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Consumes the deduplicator, returning contacts in first-seen order.
    pub fn finalize(self) -> Vec<Contact> {
        self.contacts
    }
}

impl Extend<Contact> for ContactDeduplicator {
    fn extend<T: IntoIterator<Item = Contact>>(&mut self, iter: T) {
        for contact in iter {
            self.observe(contact);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::PlatformIdentity;

    fn contact(name: &str, id: &str, platform: Platform) -> Contact {
        Contact::new(name, PlatformIdentity::new(id, platform))
    }

    #[test]
    fn test_first_write_wins() {
        let mut dedup = ContactDeduplicator::new();
        assert!(dedup.observe(contact("Alice", "123", Platform::Icq)));
        for _ in 0..5 {
            assert!(!dedup.observe(contact("Someone else", "123", Platform::Icq)));
        }

        let contacts = dedup.finalize();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Alice");
    }

    #[test]
    fn test_key_is_platform_scoped() {
        let mut dedup = ContactDeduplicator::new();
        dedup.observe(contact("Alice", "123", Platform::Icq));
        dedup.observe(contact("Bob", "123", Platform::Msn));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn test_empty_name_is_filled_once() {
        let mut dedup = ContactDeduplicator::new();
        dedup.observe(contact("", "bob", Platform::Skype));
        dedup.observe(contact("Bob", "bob", Platform::Skype));
        dedup.observe(contact("Robert", "bob", Platform::Skype));

        let contacts = dedup.finalize();
        assert_eq!(contacts[0].name, "Bob");
    }

    #[test]
    fn test_identities_untouched() {
        let mut dedup = ContactDeduplicator::new();
        dedup.observe(contact("Alice", "1", Platform::Icq));
        let richer = contact("Alice", "1", Platform::Icq)
            .with_identity(PlatformIdentity::new("alice@msn.com", Platform::Msn));
        dedup.observe(richer);

        let contacts = dedup.finalize();
        assert_eq!(contacts[0].identities().len(), 1);
    }

    #[test]
    fn test_preserves_first_seen_order() {
        let mut dedup = ContactDeduplicator::new();
        dedup.extend([
            contact("C", "3", Platform::Sms),
            contact("A", "1", Platform::Sms),
            contact("C again", "3", Platform::Sms),
            contact("B", "2", Platform::Sms),
        ]);
        let names: Vec<_> = dedup.finalize().into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["C", "A", "B"]);
    }
}
