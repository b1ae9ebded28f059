//! Cache elements: the value holder and mutual-exclusion token for one key.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::item::ResolvedItem;

// =============================================================================
// Payload
// =============================================================================

/// The committed result of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// The item was loaded.
    Present(Arc<ResolvedItem>),
    /// The loader reported the item as not found.
    Absent,
}

impl Payload {
    /// The item, or `None` for a negative entry.
    pub fn item(&self) -> Option<&Arc<ResolvedItem>> {
        match self {
            Payload::Present(item) => Some(item),
            Payload::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Payload::Present(_))
    }
}

// =============================================================================
// ElementState
// =============================================================================

/// Lifecycle of a cache element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementState {
    /// No payload yet; the next token holder must load.
    Stale,
    /// A token holder has claimed the load. Seen by a later token holder
    /// only if the claimant was cancelled before finishing.
    Claimed,
    /// Terminal until the store drops the element.
    Fresh(Payload),
}

// =============================================================================
// CacheElement
// =============================================================================

/// A mutable holder for one cached payload.
///
/// The element doubles as the mutual-exclusion token for its key: state is
/// only changed through an [`ElementGuard`], and the guard is held for the
/// whole load. Waiters blocked on [`CacheElement::lock`] therefore observe
/// either the committed payload or a state they are entitled to claim.
#[derive(Debug)]
pub struct CacheElement {
    state: Mutex<ElementState>,
}

impl CacheElement {
    /// Create a stale element, as handed out on a cache miss.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ElementState::Stale),
        }
    }

    /// Create an element that already holds a payload.
    pub fn fresh(payload: Payload) -> Self {
        Self {
            state: Mutex::new(ElementState::Fresh(payload)),
        }
    }

    /// Return the payload without waiting, if the element is fresh.
    ///
    /// Returns `None` when the element is stale or when the token is held by
    /// a loader; callers then fall back to [`CacheElement::lock`].
    pub fn peek(&self) -> Option<Payload> {
        let state = self.state.try_lock().ok()?;
        match &*state {
            ElementState::Fresh(payload) => Some(payload.clone()),
            ElementState::Stale | ElementState::Claimed => None,
        }
    }

    /// Acquire the token, waiting for any in-progress load to finish.
    pub async fn lock(&self) -> ElementGuard<'_> {
        ElementGuard {
            state: self.state.lock().await,
        }
    }
}

impl Default for CacheElement {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ElementGuard
// =============================================================================

/// Exclusive access to a cache element's state.
///
/// Dropping the guard releases the token.
pub struct ElementGuard<'a> {
    state: MutexGuard<'a, ElementState>,
}

impl ElementGuard<'_> {
    pub fn state(&self) -> &ElementState {
        &self.state
    }

    /// The committed payload, if the element is fresh.
    pub fn payload(&self) -> Option<&Payload> {
        match &*self.state {
            ElementState::Fresh(payload) => Some(payload),
            ElementState::Stale | ElementState::Claimed => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(&*self.state, ElementState::Fresh(_))
    }

    /// Claim the load for the current token holder.
    pub fn claim(&mut self) {
        *self.state = ElementState::Claimed;
    }

    /// Publish a payload, making the element fresh.
    pub fn fill(&mut self, payload: Payload) {
        *self.state = ElementState::Fresh(payload);
    }

    /// Return the element to stale so a later resolution loads again.
    pub fn reset(&mut self) {
        *self.state = ElementState::Stale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemMetadata;

    fn item() -> Arc<ResolvedItem> {
        Arc::new(ResolvedItem::new(
            "tcm:7-42",
            b"png".to_vec(),
            ItemMetadata::for_path("/a.png"),
        ))
    }

    #[tokio::test]
    async fn test_new_element_is_stale() {
        let element = CacheElement::new();
        assert_eq!(element.peek(), None);
        assert_eq!(element.lock().await.state(), &ElementState::Stale);
    }

    #[tokio::test]
    async fn test_fill_makes_fresh() {
        let element = CacheElement::new();
        {
            let mut guard = element.lock().await;
            guard.claim();
            assert!(!guard.is_fresh());
            guard.fill(Payload::Present(item()));
            assert!(guard.is_fresh());
        }
        assert_eq!(element.peek(), Some(Payload::Present(item())));
    }

    #[tokio::test]
    async fn test_absent_is_fresh() {
        let element = CacheElement::fresh(Payload::Absent);
        assert_eq!(element.peek(), Some(Payload::Absent));
        assert!(element.lock().await.is_fresh());
    }

    #[tokio::test]
    async fn test_peek_while_locked() {
        let element = CacheElement::fresh(Payload::Absent);
        let _guard = element.lock().await;
        assert_eq!(element.peek(), None);
    }

    #[tokio::test]
    async fn test_reset() {
        let element = CacheElement::new();
        let mut guard = element.lock().await;
        guard.claim();
        guard.reset();
        assert_eq!(guard.state(), &ElementState::Stale);
        assert_eq!(guard.payload(), None);
    }

    #[test]
    fn test_payload_item() {
        assert!(Payload::Present(item()).is_present());
        assert_eq!(Payload::Absent.item(), None);
    }
}
