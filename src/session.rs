// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use futures_util::lock::Mutex;
use log::{debug, info, warn};
use tokio::sync::watch;

use crate::{
    error::{self, Result},
    model::{Identity, Token},
    storage::Storage,
};

pub(crate) const TOKEN_KEY: &str = "authToken";
pub(crate) const IDENTITY_KEY: &str = "userData";

/// The bearer token and identity of the signed-in user, or neither.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum Session {
    #[default]
    Unauthenticated,
    Authenticated {
        token: Token,
        identity: Identity,
    },
}

impl Session {
    pub(crate) const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub(crate) const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated { identity, .. } => Some(identity),
            Self::Unauthenticated => None,
        }
    }

    pub(crate) const fn token(&self) -> Option<&Token> {
        match self {
            Self::Authenticated { token, .. } => Some(token),
            Self::Unauthenticated => None,
        }
    }
}

/// What observers of the store see.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct State {
    restored: bool,
    session: Session,
}

impl State {
    pub(crate) const fn is_restored(&self) -> bool {
        self.restored
    }

    pub(crate) const fn session(&self) -> &Session {
        &self.session
    }
}

/// Issued when an authentication request starts. A commit made with a
/// ticket only lands if nothing else touched the session in the meantime.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Ticket(u64);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Commit {
    Applied,
    Superseded,
}

struct Inner {
    storage: Box<dyn Storage>,
    generation: u64,
}

/// Owner of the session. Every mutation goes through the same lock, which
/// also guards the storage slots and the generation counter, and is
/// published to subscribers before the lock is released.
pub(crate) struct Store {
    inner: Mutex<Inner>,
    state: watch::Sender<State>,
}

impl Store {
    pub(crate) fn new<S: Storage + 'static>(storage: S) -> Self {
        let (state, _) = watch::channel(State::default());
        Self {
            inner: Mutex::new(Inner {
                storage: Box::new(storage),
                generation: 0,
            }),
            state,
        }
    }

    pub(crate) fn snapshot(&self) -> Session {
        self.state.borrow().session.clone()
    }

    #[allow(dead_code)]
    pub(crate) fn state(&self) -> State {
        self.state.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<State> {
        self.state.subscribe()
    }

    /// Loads the persisted session. Anything inconsistent in storage is
    /// wiped and the session starts out signed out.
    pub(crate) async fn restore(&self) {
        let mut inner = self.inner.lock().await;
        let session = match load(&mut *inner.storage).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Discarding the stored session: {}", e);
                if let Err(e) = erase(&mut *inner.storage).await {
                    warn!("Could not remove the stored session: {}", e);
                }
                Session::Unauthenticated
            }
        };

        if let Some(identity) = session.identity() {
            info!("Restored session for {}", identity.email);
        } else {
            debug!("No stored session");
        }

        let _ = self.state.send_replace(State {
            restored: true,
            session,
        });
    }

    pub(crate) async fn begin(&self) -> Ticket {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        Ticket(inner.generation)
    }

    pub(crate) async fn commit(&self, token: Token, identity: Identity) -> Result<()> {
        check(&token, &identity)?;

        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        self.write(&mut inner, token, identity).await
    }

    pub(crate) async fn commit_for(
        &self,
        ticket: Ticket,
        token: Token,
        identity: Identity,
    ) -> Result<Commit> {
        check(&token, &identity)?;

        let mut inner = self.inner.lock().await;
        if inner.generation != ticket.0 {
            debug!(
                "Discarding the session for {} because a later request replaced it",
                identity.email
            );
            return Ok(Commit::Superseded);
        }
        inner.generation += 1;
        self.write(&mut inner, token, identity).await?;
        Ok(Commit::Applied)
    }

    pub(crate) async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        let erased = erase(&mut *inner.storage).await;
        if self.sign_out() {
            info!("Signed out");
        }
        erased
    }

    async fn write(&self, inner: &mut Inner, token: Token, identity: Identity) -> Result<()> {
        if let Err(e) = persist(&mut *inner.storage, &token, &identity).await {
            if let Err(erase_err) = erase(&mut *inner.storage).await {
                warn!("Could not remove a partially stored session: {}", erase_err);
            }
            let _ = self.sign_out();
            return Err(e);
        }

        info!("Signed in as {} ({})", identity.email, identity.role);
        self.state.send_modify(|state| {
            state.session = Session::Authenticated { token, identity };
        });
        Ok(())
    }

    fn sign_out(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.session.is_authenticated() {
                state.session = Session::Unauthenticated;
                true
            } else {
                false
            }
        })
    }
}

fn check(token: &Token, identity: &Identity) -> Result<(), error::Session> {
    if token.is_empty() {
        return Err(error::Session::EmptyToken);
    }
    identity
        .validate()
        .map_err(error::Session::IncompleteIdentity)
}

async fn load(storage: &mut dyn Storage) -> Result<Session, error::Corruption> {
    let unreadable = |e| error::Corruption::Unreadable(Box::new(e));
    let token = storage.get(TOKEN_KEY).await.map_err(unreadable)?;
    let identity = storage.get(IDENTITY_KEY).await.map_err(unreadable)?;

    match (token, identity) {
        (None, None) => Ok(Session::Unauthenticated),
        (Some(_), None) => Err(error::Corruption::MissingIdentity),
        (None, Some(_)) => Err(error::Corruption::MissingToken),
        (Some(token), Some(identity)) => {
            if token.is_empty() {
                return Err(error::Corruption::EmptyToken);
            }
            let identity: Identity = serde_json::from_str(&identity)
                .map_err(|e| error::Corruption::MalformedIdentity(e.to_string()))?;
            identity.validate().map_err(|field| {
                error::Corruption::MalformedIdentity(format!("the {field} is empty"))
            })?;
            Ok(Session::Authenticated {
                token: Token::new(token),
                identity,
            })
        }
    }
}

async fn persist(storage: &mut dyn Storage, token: &Token, identity: &Identity) -> Result<()> {
    let serialized = serde_json::to_string(identity)?;
    storage.set(IDENTITY_KEY, &serialized).await?;
    storage.set(TOKEN_KEY, token.expose()).await
}

async fn erase(storage: &mut dyn Storage) -> Result<()> {
    let token = storage.remove(TOKEN_KEY).await;
    let identity = storage.remove(IDENTITY_KEY).await;
    token.and(identity)
}
