use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::browser::{BrowserSession, ElementRef, Pacing, Selector};
use crate::config::{FieldMatcher, LoginSection, SelectorSection};

use super::error::{DiscoveryError, DiscoveryResult};
use super::model::Credentials;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Start,
    MobileGateCheck,
    ProviderPicker,
    CredentialEntry,
    Submitted,
    Retry,
    Success,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginEvent {
    Begin,
    GateHandled,
    PickerAbsent,
    ProviderSelected,
    CredentialsSubmitted,
    PlayReady,
    PlayTimedOut,
    Restart,
}

/// Transition table of the provider login. Every round ends waiting for the
/// play affordance, whether or not a picker was shown. Each failed round goes
/// back through `Retry` to `Start`; the round that reaches `attempt_limit`
/// failures ends in `Fatal`.
#[derive(Debug, Clone)]
pub struct LoginFlow {
    state: LoginState,
    failed_rounds: usize,
    attempt_limit: usize,
}

impl LoginFlow {
    pub fn new(attempt_limit: usize) -> Self {
        Self {
            state: LoginState::Start,
            failed_rounds: 0,
            attempt_limit: attempt_limit.max(1),
        }
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    pub fn failed_rounds(&self) -> usize {
        self.failed_rounds
    }

    pub fn advance(&mut self, event: LoginEvent) -> DiscoveryResult<LoginState> {
        use LoginEvent as E;
        use LoginState as S;

        let next = match (self.state, event) {
            (S::Start, E::Begin) => S::MobileGateCheck,
            (S::MobileGateCheck, E::GateHandled) => S::ProviderPicker,
            (S::ProviderPicker, E::PickerAbsent) => S::Submitted,
            (S::ProviderPicker, E::ProviderSelected) => S::CredentialEntry,
            (S::CredentialEntry, E::CredentialsSubmitted) => S::Submitted,
            (S::Submitted, E::PlayReady) => S::Success,
            (S::Submitted, E::PlayTimedOut) => {
                self.failed_rounds += 1;
                if self.failed_rounds >= self.attempt_limit {
                    S::Fatal
                } else {
                    S::Retry
                }
            }
            (S::Retry, E::Restart) => S::Start,
            (state, event) => {
                return Err(DiscoveryError::LoginTransition(format!(
                    "{event:?} is not valid in state {state:?}"
                )))
            }
        };
        self.state = next;
        Ok(next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginField {
    Username,
    Password,
    Submit,
}

impl fmt::Display for LoginField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoginField::Username => "username",
            LoginField::Password => "password",
            LoginField::Submit => "submit",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// Rounds started, including the successful one.
    pub rounds: usize,
    pub failed_rounds: usize,
    /// Play affordance confirmed by the final round.
    pub play_button: ElementRef,
}

/// Drives [`LoginFlow`] against a live page.
#[derive(Debug, Clone)]
pub struct LoginStateMachine {
    selectors: SelectorSection,
    login: LoginSection,
    logo_pattern: Regex,
}

impl LoginStateMachine {
    pub fn new(selectors: SelectorSection, login: LoginSection) -> DiscoveryResult<Self> {
        let logo_pattern = Regex::new(&selectors.provider_logo_pattern).map_err(|err| {
            DiscoveryError::Configuration(format!("invalid provider logo pattern: {err}"))
        })?;
        Ok(Self {
            selectors,
            login,
            logo_pattern,
        })
    }

    pub async fn run(
        &self,
        session: &mut dyn BrowserSession,
        credentials: &Credentials,
        pacing: &mut Pacing,
    ) -> DiscoveryResult<LoginOutcome> {
        let mut flow = LoginFlow::new(self.login.attempt_limit);
        let mut rounds = 0usize;
        let mut play_button = None;

        loop {
            let event = match flow.state() {
                LoginState::Start => {
                    rounds += 1;
                    debug!(round = rounds, provider = %credentials.provider, "starting login round");
                    LoginEvent::Begin
                }
                LoginState::MobileGateCheck => {
                    self.pass_mobile_gate(session, pacing).await?;
                    LoginEvent::GateHandled
                }
                LoginState::ProviderPicker => {
                    if self.select_provider(session, credentials, pacing).await? {
                        LoginEvent::ProviderSelected
                    } else {
                        LoginEvent::PickerAbsent
                    }
                }
                LoginState::CredentialEntry => {
                    self.enter_credentials(session, credentials, pacing).await?;
                    LoginEvent::CredentialsSubmitted
                }
                LoginState::Submitted => {
                    let play = Selector::css(self.selectors.play_button.as_str());
                    match session
                        .wait_for_clickable(&play, pacing.element_timeout())
                        .await
                    {
                        Ok(element) => {
                            play_button = Some(element);
                            LoginEvent::PlayReady
                        }
                        Err(err) if err.is_timeout() => {
                            warn!(
                                round = rounds,
                                failed = flow.failed_rounds() + 1,
                                limit = self.login.attempt_limit,
                                "play button did not appear after login"
                            );
                            LoginEvent::PlayTimedOut
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                LoginState::Retry => {
                    pacing.login_retry_delay().await;
                    LoginEvent::Restart
                }
                LoginState::Success => {
                    let play_button = play_button.ok_or_else(|| {
                        DiscoveryError::LoginTransition(
                            "reached Success without a play affordance".into(),
                        )
                    })?;
                    info!(rounds, provider = %credentials.provider, "login succeeded");
                    return Ok(LoginOutcome {
                        rounds,
                        failed_rounds: flow.failed_rounds(),
                        play_button,
                    });
                }
                LoginState::Fatal => {
                    return Err(DiscoveryError::LoginAttemptsExhausted {
                        attempts: flow.failed_rounds(),
                    });
                }
            };
            flow.advance(event)?;
        }
    }

    /// Some providers put a "temp pass" shortcut in front of the picker. A
    /// missing shortcut means the picker is already showing.
    async fn pass_mobile_gate(
        &self,
        session: &mut dyn BrowserSession,
        pacing: &mut Pacing,
    ) -> DiscoveryResult<()> {
        let gate = Selector::css(self.selectors.temp_pass.as_str());
        match session
            .wait_for_clickable(&gate, pacing.element_timeout())
            .await
        {
            Ok(button) => {
                debug!("mobile login gate present, activating");
                session.click(button).await?;
                Ok(())
            }
            Err(err) if err.is_timeout() => {
                debug!("no mobile login gate");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Returns `false` when no picker shows up. The round then goes straight to
    /// waiting for play.
    async fn select_provider(
        &self,
        session: &mut dyn BrowserSession,
        credentials: &Credentials,
        pacing: &mut Pacing,
    ) -> DiscoveryResult<bool> {
        let picker = Selector::css(self.selectors.provider_search.as_str());
        match session
            .wait_for_clickable(&picker, pacing.element_timeout())
            .await
        {
            Ok(_) => {}
            Err(err) if err.is_timeout() => {
                debug!("no provider picker, waiting for play");
                return Ok(false);
            }
            Err(err) => return Err(err.into()),
        }

        let providers = self.picker_tiles(session).await?;
        let wanted = credentials.provider.to_lowercase();
        let tile = match providers.get(&wanted) {
            Some(tile) => *tile,
            None => {
                return Err(DiscoveryError::ProviderNotSupported {
                    provider: credentials.provider.clone(),
                    available: providers.into_keys().collect(),
                })
            }
        };
        debug!(provider = %wanted, "selecting provider tile");
        session.click(tile).await?;

        let form = Selector::xpath(self.selectors.credential_form_xpath.as_str());
        session
            .wait_for_clickable(&form, pacing.element_timeout())
            .await?;
        Ok(true)
    }

    /// Provider identifier (lower-cased logo asset name) to its clickable tile.
    async fn picker_tiles(
        &self,
        session: &mut dyn BrowserSession,
    ) -> DiscoveryResult<BTreeMap<String, ElementRef>> {
        let logos = Selector::css(self.selectors.provider_logo.as_str());
        let mut providers = BTreeMap::new();
        for tile in session.find_elements(&logos).await? {
            let Some(src) = session.attribute(tile, "src").await? else {
                continue;
            };
            providers.insert(self.provider_id(&src), tile);
        }
        Ok(providers)
    }

    fn provider_id(&self, src: &str) -> String {
        self.logo_pattern
            .captures(src)
            .and_then(|captures| captures.get(1))
            .map(|group| group.as_str())
            .unwrap_or(src)
            .to_lowercase()
    }

    async fn enter_credentials(
        &self,
        session: &mut dyn BrowserSession,
        credentials: &Credentials,
        pacing: &mut Pacing,
    ) -> DiscoveryResult<()> {
        let username = self.locate_field(session, LoginField::Username).await?;
        let password = self.locate_field(session, LoginField::Password).await?;
        let submit = self.locate_field(session, LoginField::Submit).await?;

        session.type_text(username, &credentials.username).await?;
        pacing.keystroke_pause().await;
        session.type_text(password, &credentials.password).await?;
        pacing.keystroke_pause().await;
        session.click(submit).await?;
        Ok(())
    }

    async fn locate_field(
        &self,
        session: &mut dyn BrowserSession,
        field: LoginField,
    ) -> DiscoveryResult<ElementRef> {
        let synonyms = match field {
            LoginField::Username => &self.login.fields.username,
            LoginField::Password => &self.login.fields.password,
            LoginField::Submit => &self.login.fields.submit,
        };
        for FieldMatcher { tag, attribute } in &self.login.matchers {
            for synonym in synonyms {
                let selector = Selector::tag_with_attribute(tag, attribute, synonym);
                match session.find_element(&selector).await {
                    Ok(element) => {
                        debug!(%field, selector = %selector, "login field located");
                        return Ok(element);
                    }
                    Err(err) if err.is_not_found() => continue,
                    Err(err) => return Err(err.into()),
                }
            }
        }
        Err(DiscoveryError::LoginFieldNotFound {
            field: field.to_string(),
        })
    }
}
