use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::entities::Role;
use crate::utils::jwt::Claims;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl From<&Claims> for Session {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email.clone(),
            role: claims.role,
        }
    }
}

/// The signed-in identity, shared with everything that depends on it.
///
/// Views follow [`SessionContext::user_ids`] and re-key whenever the user
/// changes; signing out moves them back to idle.
#[derive(Clone)]
pub struct SessionContext {
    current: watch::Sender<Option<Session>>,
}

impl SessionContext {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { current }
    }

    pub fn sign_in(&self, session: Session) {
        tracing::debug!(user_id = %session.user_id, "session started");
        self.current.send_replace(Some(session));
    }

    /// Explicitly invalidate the session.
    pub fn sign_out(&self) {
        if let Some(previous) = self.current.send_replace(None) {
            tracing::debug!(user_id = %previous.user_id, "session ended");
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }

    /// The signed-in user id as a watch channel, for keying views.
    pub fn user_ids(&self) -> watch::Receiver<Option<Uuid>> {
        let mut sessions = self.subscribe();
        let initial = sessions.borrow_and_update().as_ref().map(|s| s.user_id);
        let (sender, receiver) = watch::channel(initial);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = sessions.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let user_id = sessions.borrow_and_update().as_ref().map(|s| s.user_id);
                        sender.send_if_modified(|current| {
                            if *current == user_id {
                                return false;
                            }
                            *current = user_id;
                            true
                        });
                    }
                    _ = sender.closed() => break,
                }
            }
        });

        receiver
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
