// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{collections::HashMap, fmt, fs, path::Path, sync::Arc};

use log::debug;
use serde::Deserialize;
use tokio::sync::watch;

use crate::{
    error::{self, Result},
    model::{Identity, Role},
    session::{State, Store},
};

/// A protected screen and the roles allowed to see it. No roles means any
/// signed-in user.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub(crate) struct Screen {
    pub(crate) path: String,
    #[serde(default)]
    pub(crate) roles: Vec<Role>,
}

impl Screen {
    pub(crate) fn permits(&self, role: Role) -> bool {
        self.roles.is_empty() || self.roles.contains(&role)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Routes {
    entry: String,
    /// Where signing out leads.
    #[serde(default = "default_landing")]
    landing: String,
    #[serde(default)]
    homes: HashMap<Role, String>,
    #[serde(default)]
    screens: Vec<Screen>,
}

impl Routes {
    pub(crate) fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = fs::File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    pub(crate) fn landing(&self) -> &str {
        &self.landing
    }

    pub(crate) fn home(&self, role: Role) -> String {
        self.homes
            .get(&role)
            .cloned()
            .unwrap_or_else(|| format!("/dashboard/{role}"))
    }

    pub(crate) fn screen(&self, path: &str) -> Result<&Screen, error::Input> {
        let wanted = normalize(path);
        self.screens
            .iter()
            .find(|screen| normalize(&screen.path) == wanted)
            .ok_or_else(|| error::Input::UnknownScreen(path.to_owned()))
    }

    pub(crate) fn decide(&self, screen: &Screen, state: &State) -> Decision {
        if !state.is_restored() {
            return Decision::Pending;
        }

        match state.session().identity() {
            None => Decision::DeniedAnonymous {
                redirect: self.entry.clone(),
            },
            Some(identity) if screen.permits(identity.role) => Decision::Granted,
            Some(identity) => Decision::DeniedWrongRole {
                role: identity.role,
                redirect: self.home(identity.role),
            },
        }
    }
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            entry: "/login".to_owned(),
            landing: default_landing(),
            homes: HashMap::new(),
            screens: Role::ALL
                .into_iter()
                .map(|role| Screen {
                    path: format!("/dashboard/{role}"),
                    roles: vec![role],
                })
                .collect(),
        }
    }
}

fn default_landing() -> String {
    "/".to_owned()
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Decision {
    Pending,
    DeniedAnonymous { redirect: String },
    DeniedWrongRole { role: Role, redirect: String },
    Granted,
}

impl Decision {
    pub(crate) fn redirect(&self) -> Option<&str> {
        match self {
            Self::DeniedAnonymous { redirect } | Self::DeniedWrongRole { redirect, .. } => {
                Some(redirect)
            }
            Self::Pending | Self::Granted => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Granted => f.write_str("granted"),
            Self::DeniedAnonymous { redirect } => {
                write!(f, "denied: not signed in; redirecting to {redirect}")
            }
            Self::DeniedWrongRole { role, redirect } => {
                write!(f, "denied: not available to a {role}; redirecting to {redirect}")
            }
        }
    }
}

/// Access decision for one mounted screen, kept up to date with the store.
pub(crate) struct Guard {
    routes: Arc<Routes>,
    screen: Screen,
    rx: watch::Receiver<State>,
    current: Decision,
}

impl Guard {
    pub(crate) fn mount(routes: Arc<Routes>, screen: Screen, store: &Store) -> Self {
        let rx = store.subscribe();
        let current = routes.decide(&screen, &rx.borrow());
        Self {
            routes,
            screen,
            rx,
            current,
        }
    }

    #[allow(dead_code)]
    pub(crate) const fn decision(&self) -> &Decision {
        &self.current
    }

    /// Waits until the store has been restored and returns the first real
    /// decision.
    pub(crate) async fn resolve(&mut self) -> Decision {
        loop {
            let decision = self.routes.decide(&self.screen, &self.rx.borrow_and_update());
            if decision != Decision::Pending {
                self.current = decision.clone();
                return decision;
            }
            if self.rx.changed().await.is_err() {
                // The store went away before restoring anything.
                self.current = Decision::DeniedAnonymous {
                    redirect: self.routes.entry.clone(),
                };
                return self.current.clone();
            }
        }
    }

    /// Waits for a session change that alters the decision. Returns `None`
    /// once the store is gone.
    #[allow(dead_code)]
    pub(crate) async fn next(&mut self) -> Option<Decision> {
        loop {
            self.rx.changed().await.ok()?;
            let decision = self.routes.decide(&self.screen, &self.rx.borrow_and_update());
            if decision != self.current {
                debug!("Access to {} is now {}", self.screen.path, decision);
                self.current = decision.clone();
                return Some(decision);
            }
        }
    }
}

/// Turns sign-in and sign-out into navigation: a new identity goes to its
/// role's home, losing the identity goes to the landing page. Whatever
/// the store holds once restored is the starting point and does not
/// navigate, so mount it after restoring.
pub(crate) struct Navigator {
    routes: Arc<Routes>,
    rx: watch::Receiver<State>,
    seen: Option<Option<Identity>>,
}

impl Navigator {
    pub(crate) fn new(routes: Arc<Routes>, store: &Store) -> Self {
        let rx = store.subscribe();
        let seen = Self::observe(&rx.borrow());
        Self { routes, rx, seen }
    }

    fn observe(state: &State) -> Option<Option<Identity>> {
        state
            .is_restored()
            .then(|| state.session().identity().cloned())
    }

    fn settle(&mut self) -> Option<String> {
        let observed = Self::observe(&self.rx.borrow_and_update())?;
        let previous = self.seen.replace(observed.clone())?;
        (previous != observed).then(|| match observed {
            Some(identity) => self.routes.home(identity.role),
            None => self.routes.landing.clone(),
        })
    }

    /// Where to go because of changes already made, without waiting for
    /// new ones.
    pub(crate) fn poll(&mut self) -> Option<String> {
        if self.rx.has_changed().unwrap_or(false) {
            self.settle()
        } else {
            None
        }
    }

    #[allow(dead_code)]
    pub(crate) async fn next(&mut self) -> Option<String> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(destination) = self.settle() {
                return Some(destination);
            }
        }
    }
}
