//! One selected value, many views.
//!
//! The practical panel and the menu both show a language dropdown. Instead of
//! two widgets assigning to each other, both subscribe to a single
//! `Selection` and render whatever it currently holds.

use tokio::sync::watch;

#[derive(Debug)]
pub struct Selection<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone + PartialEq> Selection<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn current(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Returns true when the value actually changed; subscribers are only
    /// notified in that case.
    pub fn select(&self, value: T) -> bool {
        self.tx.send_if_modified(|cur| {
            if *cur == value {
                false
            } else {
                *cur = value;
                true
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Language;

    #[tokio::test]
    async fn every_view_sees_the_same_selection() {
        let sel = Selection::new(Language::Python);
        let mut main_view = sel.subscribe();
        let menu_view = sel.subscribe();

        assert!(sel.select(Language::Java));
        main_view.changed().await.unwrap();
        assert_eq!(*main_view.borrow(), Language::Java);
        assert_eq!(*menu_view.borrow(), Language::Java);
        assert_eq!(sel.current(), Language::Java);
    }

    #[test]
    fn reselecting_the_same_value_is_not_a_change() {
        let sel = Selection::new(Language::Python);
        let rx = sel.subscribe();
        assert!(!sel.select(Language::Python));
        assert!(!rx.has_changed().unwrap());
    }
}
