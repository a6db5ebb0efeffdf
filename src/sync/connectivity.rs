use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use uuid::Uuid;

pub type ListenerId = Uuid;

type Listener = Arc<dyn Fn(bool) + Send + Sync>;

struct Inner {
    state: watch::Sender<bool>,
    listeners: Mutex<HashMap<ListenerId, Listener>>,
}

/// Shared online/offline flag. Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct Connectivity {
    inner: Arc<Inner>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (state, _) = watch::channel(online);
        Self {
            inner: Arc::new(Inner {
                state,
                listeners: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.inner.state.borrow()
    }

    /// Returns true when the flag actually changed. Listeners only hear about changes.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.inner.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if !changed {
            return false;
        }

        log::info!("connectivity changed: {}", if online { "online" } else { "offline" });
        // Called outside the lock so a listener may add or remove listeners.
        let listeners: Vec<Listener> = match self.inner.listeners.lock() {
            Ok(listeners) => listeners.values().cloned().collect(),
            Err(_) => {
                log::error!("connectivity listener registry poisoned");
                Vec::new()
            }
        };
        for listener in listeners {
            listener(online);
        }
        true
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.state.subscribe()
    }

    pub fn add_listener(&self, listener: impl Fn(bool) + Send + Sync + 'static) -> ListenerId {
        let id = Uuid::new_v4();
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.insert(id, Arc::new(listener));
        }
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner
            .listeners
            .lock()
            .map(|mut listeners| listeners.remove(&id).is_some())
            .unwrap_or(false)
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn listeners_hear_transitions_only() {
        let conn = Connectivity::new(true);
        let heard = Arc::new(Mutex::new(Vec::new()));
        let sink = heard.clone();
        conn.add_listener(move |online| sink.lock().unwrap().push(online));

        assert!(!conn.set_online(true));
        assert!(conn.set_online(false));
        assert!(!conn.set_online(false));
        assert!(conn.set_online(true));

        assert_eq!(*heard.lock().unwrap(), vec![false, true]);
        assert!(conn.is_online());
    }

    #[test]
    fn removed_listener_is_not_called() {
        let conn = Connectivity::new(false);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let id = conn.add_listener(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(conn.remove_listener(id));
        assert!(!conn.remove_listener(id));
        conn.set_online(true);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_can_remove_itself() {
        let conn = Connectivity::new(true);
        let calls = Arc::new(AtomicUsize::new(0));
        let own_id = Arc::new(Mutex::new(None::<ListenerId>));

        let handle = conn.clone();
        let counter = calls.clone();
        let slot = own_id.clone();
        let id = conn.add_listener(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *slot.lock().unwrap() {
                handle.remove_listener(id);
            }
        });
        *own_id.lock().unwrap() = Some(id);

        let (tx, rx) = std::sync::mpsc::channel();
        let worker = conn.clone();
        std::thread::spawn(move || {
            worker.set_online(false);
            worker.set_online(true);
            let _ = tx.send(());
        });

        rx.recv_timeout(std::time::Duration::from_secs(3))
            .expect("set_online returned");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!conn.remove_listener(id));
    }

    #[test]
    fn listener_can_register_another() {
        let conn = Connectivity::new(true);
        let handle = conn.clone();
        conn.add_listener(move |_| {
            handle.add_listener(|_| {});
        });
        assert!(conn.set_online(false));
        assert_eq!(conn.inner.listeners.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn subscribers_see_latest_state() {
        let conn = Connectivity::new(true);
        let mut rx = conn.subscribe();
        let handle = conn.clone();
        handle.set_online(false);
        rx.changed().await.expect("sender alive");
        assert!(!*rx.borrow());
    }
}
