use vulnfusion_client_core::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Before the session store has been consulted. Renders neutral loading,
    /// never the protected content and never an immediate redirect.
    Unknown,
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Loading,
    Render,
    RedirectToLogin,
}

/// Gates protected views behind session presence. Terminal once resolved,
/// until a session change re-arms it via `invalidate()`.
#[derive(Debug)]
pub struct RouteGuard {
    state: GuardState,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteGuard {
    pub fn new() -> Self {
        Self {
            state: GuardState::Unknown,
        }
    }

    /// Consults the session store exactly once; later calls keep the
    /// resolved state.
    pub fn resolve(&mut self, session: &SessionStore) -> GuardState {
        if self.state == GuardState::Unknown {
            self.state = if session.is_authenticated() {
                GuardState::Authenticated
            } else {
                GuardState::Unauthenticated
            };
        }
        self.state
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn decision(&self) -> GuardDecision {
        match self.state {
            GuardState::Unknown => GuardDecision::Loading,
            GuardState::Authenticated => GuardDecision::Render,
            // No return path is preserved; post-login lands on the default view.
            GuardState::Unauthenticated => GuardDecision::RedirectToLogin,
        }
    }

    /// Re-arms the guard after a login or logout.
    pub fn invalidate(&mut self) {
        self.state = GuardState::Unknown;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_session_renders_loading_then_redirect_never_the_view() {
        let session = SessionStore::in_memory();
        let mut guard = RouteGuard::new();

        assert_eq!(guard.decision(), GuardDecision::Loading);

        guard.resolve(&session);
        assert_eq!(guard.decision(), GuardDecision::RedirectToLogin);

        // repeated renders stay on the redirect
        guard.resolve(&session);
        assert_eq!(guard.decision(), GuardDecision::RedirectToLogin);
    }

    #[test]
    fn present_session_renders_protected_content() {
        let session = SessionStore::in_memory();
        session.set_token("tok").unwrap();
        let mut guard = RouteGuard::new();

        guard.resolve(&session);
        assert_eq!(guard.decision(), GuardDecision::Render);
    }

    #[test]
    fn resolution_is_terminal_until_invalidated() {
        let session = SessionStore::in_memory();
        let mut guard = RouteGuard::new();
        guard.resolve(&session);
        assert_eq!(guard.decision(), GuardDecision::RedirectToLogin);

        // session appears, but the guard holds until re-armed
        session.set_token("tok").unwrap();
        guard.resolve(&session);
        assert_eq!(guard.decision(), GuardDecision::RedirectToLogin);

        guard.invalidate();
        assert_eq!(guard.decision(), GuardDecision::Loading);
        guard.resolve(&session);
        assert_eq!(guard.decision(), GuardDecision::Render);
    }
}
