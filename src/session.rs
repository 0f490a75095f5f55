// 🔐 Password gate - one shared password, explicit per-user session
//
// No global "password correct" flag: each front end owns its Session values
// and asks the gate to unlock them.

use sha2::{Digest, Sha256};

fn digest(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

/// Holds the digest of the shared password (never the plaintext)
#[derive(Clone)]
pub struct PasswordGate {
    expected: Option<[u8; 32]>,
}

impl PasswordGate {
    /// No configured password → open gate, every session starts unlocked
    pub fn new(password: Option<&str>) -> Self {
        PasswordGate {
            expected: password.filter(|p| !p.is_empty()).map(digest),
        }
    }

    pub fn is_open(&self) -> bool {
        self.expected.is_none()
    }

    pub fn verify(&self, candidate: &str) -> bool {
        match &self.expected {
            None => true,
            Some(expected) => {
                let got = digest(candidate);
                // Compare every byte regardless of where the first mismatch is
                expected
                    .iter()
                    .zip(got.iter())
                    .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                    == 0
            }
        }
    }
}

impl std::fmt::Debug for PasswordGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordGate")
            .field("open", &self.is_open())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Accepted,
    /// Wrong password ("Password errata.")
    Rejected,
    /// Nothing typed yet; no error shown
    Empty,
}

/// One user's authentication state
#[derive(Debug, Clone, Default)]
pub struct Session {
    authenticated: bool,
}

impl Session {
    pub fn new(gate: &PasswordGate) -> Self {
        Session {
            authenticated: gate.is_open(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn login(&mut self, gate: &PasswordGate, password: &str) -> LoginOutcome {
        if self.authenticated {
            return LoginOutcome::Accepted;
        }
        if password.is_empty() {
            return LoginOutcome::Empty;
        }

        if gate.verify(password) {
            self.authenticated = true;
            log::info!("Session unlocked");
            LoginOutcome::Accepted
        } else {
            log::warn!("Rejected dashboard login attempt");
            LoginOutcome::Rejected
        }
    }

    pub fn logout(&mut self) {
        self.authenticated = false;
    }
}
