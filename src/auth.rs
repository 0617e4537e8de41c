//! Sign-in / sign-up / one-time-code screen flow.
//!
//! The backend service owns credentials and sessions; this module only keeps
//! track of which screen is showing and what message it displays.

use std::future::Future;

use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
}

/// A failure as described by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendFailure {
    pub message: String,
}

impl BackendFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The backend reports duplicate sign-ups only through its message text.
    pub fn is_already_registered(&self) -> bool {
        self.message.to_lowercase().contains("already registered")
    }
}

pub trait AuthBackend {
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, BackendFailure>> + Send;

    /// Registers the account and sends a one-time code to `email`.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), BackendFailure>> + Send;

    fn verify_code(
        &self,
        email: &str,
        code: &str,
    ) -> impl Future<Output = Result<Session, BackendFailure>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthScreen {
    SignIn,
    SignUp,
    VerifyCode { email: String },
    SignedIn { user_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRequest {
    SignIn { email: String, password: String },
    SignUp { email: String, password: String },
    VerifyCode { code: String },
}

/// Input rejected before anything is sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("email is required")]
    MissingEmail,
    #[error("password is required")]
    MissingPassword,
    #[error("the code must contain digits only")]
    InvalidCode,
    #[error("this request does not belong on the current screen")]
    WrongScreen,
}

/// Text shown on a screen after a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Error(String),
    Info(String),
}

#[derive(Debug, Clone)]
pub struct AuthFlow {
    screen: AuthScreen,
    notice: Option<Notice>,
    email: String,
}

impl Default for AuthFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthFlow {
    pub fn new() -> Self {
        Self {
            screen: AuthScreen::SignIn,
            notice: None,
            email: String::new(),
        }
    }

    pub fn screen(&self) -> &AuthScreen {
        &self.screen
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Email pre-filled on the current screen.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Switches screens, e.g. between sign-in and sign-up, or back to a
    /// pending code entry for `email`.
    pub fn show(&mut self, screen: AuthScreen) {
        self.screen = screen;
        self.notice = None;
    }

    /// Validates `request` locally, forwards it to `backend` and moves to the
    /// resulting screen. Failures leave the screen unchanged with an error
    /// notice, except a duplicate sign-up which lands on sign-in.
    pub async fn submit<B: AuthBackend>(
        &mut self,
        backend: &B,
        request: AuthRequest,
    ) -> &AuthScreen {
        self.notice = None;
        if let Err(err) = self.validate(&request) {
            self.notice = Some(Notice::Error(err.to_string()));
            return &self.screen;
        }

        match request {
            AuthRequest::SignIn { email, password } => {
                self.email = email.trim().to_owned();
                let outcome = backend.sign_in(&self.email, &password).await;
                match outcome {
                    Ok(session) => self.signed_in(session),
                    Err(failure) => self.fail(failure),
                }
            }
            AuthRequest::SignUp { email, password } => {
                self.email = email.trim().to_owned();
                let outcome = backend.sign_up(&self.email, &password).await;
                match outcome {
                    Ok(()) => {
                        info!(email = %self.email, "sign-up accepted; awaiting code");
                        self.screen = AuthScreen::VerifyCode {
                            email: self.email.clone(),
                        };
                        self.notice = Some(Notice::Info(format!(
                            "We sent a code to {}",
                            self.email
                        )));
                    }
                    Err(failure) if failure.is_already_registered() => {
                        info!(email = %self.email, "account exists; redirecting to sign-in");
                        self.screen = AuthScreen::SignIn;
                        self.notice = Some(Notice::Info(
                            "This email is already registered. Please sign in.".to_owned(),
                        ));
                    }
                    Err(failure) => self.fail(failure),
                }
            }
            AuthRequest::VerifyCode { code } => {
                // validate() only lets codes through on the verify screen
                if let AuthScreen::VerifyCode { email } = &self.screen {
                    self.email = email.clone();
                }
                let outcome = backend.verify_code(&self.email, code.trim()).await;
                match outcome {
                    Ok(session) => self.signed_in(session),
                    Err(failure) => self.fail(failure),
                }
            }
        }
        &self.screen
    }

    fn validate(&self, request: &AuthRequest) -> Result<(), InputError> {
        match (request, &self.screen) {
            (AuthRequest::SignIn { email, password }, AuthScreen::SignIn)
            | (AuthRequest::SignUp { email, password }, AuthScreen::SignUp) => {
                if email.trim().is_empty() {
                    return Err(InputError::MissingEmail);
                }
                if password.is_empty() {
                    return Err(InputError::MissingPassword);
                }
                Ok(())
            }
            (AuthRequest::VerifyCode { code }, AuthScreen::VerifyCode { .. }) => {
                let code = code.trim();
                if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
                    return Err(InputError::InvalidCode);
                }
                Ok(())
            }
            _ => Err(InputError::WrongScreen),
        }
    }

    fn signed_in(&mut self, session: Session) {
        info!(user_id = %session.user_id, "signed in");
        self.screen = AuthScreen::SignedIn {
            user_id: session.user_id,
        };
    }

    fn fail(&mut self, failure: BackendFailure) {
        warn!(screen = ?self.screen, "auth request failed: {failure}");
        self.notice = Some(Notice::Error(failure.message));
    }
}
