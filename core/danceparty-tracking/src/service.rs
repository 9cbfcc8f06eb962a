//! Request dispatch and the three protocol actions.

use crate::error::{TrackingError, TrackingResult};
use crate::request::{leading_int, present, required, Action, TrackingRequest};
use chrono::Utc;
use danceparty_crypto::{session_handle, Handle, Token, TokenCipher};
use danceparty_keys::{activate_code, Grant, KeyCode};
use danceparty_store::{Product, Session, StoreError, Tag, TrackingStore, User};
use danceparty_types::Environment;
use danceparty_wire::{ReturnCode, WireResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Handles issued by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginGrant {
    pub product_id: Handle,
    pub user_id: Handle,
    pub session_id: Handle,
    /// Whether this login created the user.
    pub new_user: bool,
}

impl From<LoginGrant> for WireResponse {
    fn from(grant: LoginGrant) -> Self {
        WireResponse::new()
            .with("product_id", grant.product_id.into_string())
            .with("user_id", grant.user_id.into_string())
            .with("session_id", grant.session_id.into_string())
            .with("return_code", ReturnCode::LoginSuccessful)
    }
}

/// Credentials and token shared by `login` and `activatekey`.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleAuth<'a> {
    pub token: &'a str,
    pub product_code: &'a str,
    pub product_password: &'a str,
    /// Raw tier name; a tier nobody registered products under matches no
    /// product.
    pub env: &'a str,
}

impl<'a> ConsoleAuth<'a> {
    fn from_request(request: &'a TrackingRequest) -> TrackingResult<Self> {
        Ok(Self {
            token: required(&request.token, "token")?,
            product_code: required(&request.product_code, "product_code")?,
            product_password: required(&request.product_password, "product_password")?,
            env: required(&request.env, "env")?,
        })
    }
}

/// A telemetry event reported by `track`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEvent<'a> {
    pub product_id: &'a str,
    pub user_id: &'a str,
    pub session_id: &'a str,
    pub tag: &'a str,
    pub attributes: &'a str,
    pub delta: i64,
    pub sequence: i64,
    pub env: Environment,
}

impl<'a> TagEvent<'a> {
    fn from_request(request: &'a TrackingRequest) -> TrackingResult<Self> {
        Ok(Self {
            product_id: required(&request.product_id, "product_id")?,
            user_id: required(&request.user_id, "user_id")?,
            session_id: required(&request.session_id, "session_id")?,
            tag: required(&request.tag, "tag")?,
            attributes: present(&request.attributes).unwrap_or_default(),
            delta: leading_int(request.delta.as_deref()),
            sequence: leading_int(request.sequence.as_deref()),
            env: request.environment()?,
        })
    }
}

/// The protocol actions over a store.
pub struct TrackingService<S> {
    cipher: TokenCipher,
    store: S,
}

impl<S: TrackingStore> TrackingService<S> {
    /// Creates a service decoding tokens with `cipher`.
    pub fn new(cipher: TokenCipher, store: S) -> Self {
        Self { cipher, store }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one request. Never fails: errors become a bare `return_code`.
    pub fn handle(&self, request: &TrackingRequest, client_ip: &str) -> WireResponse {
        let outcome = request.action().and_then(|action| match action {
            Action::Login => ConsoleAuth::from_request(request)
                .and_then(|auth| self.login(auth, client_ip))
                .map(WireResponse::from),
            Action::Track => TagEvent::from_request(request)
                .and_then(|event| self.track(&event))
                .map(|()| WireResponse::status(ReturnCode::TagReceived)),
            Action::ActivateKey => {
                let key = required(&request.key, "key");
                ConsoleAuth::from_request(request)
                    .and_then(|auth| self.activate_key(auth, key?))
                    .map(|grant| {
                        WireResponse::status(ReturnCode::KeyActivationSuccessful)
                            .with("unlocked_privileges", grant.privileges)
                    })
            }
        });

        outcome.unwrap_or_else(|err| {
            let code = err.return_code();
            warn!(action = ?request.action, %code, error = %err, "request rejected");
            WireResponse::status(code)
        })
    }

    /// Opens a session for a console.
    ///
    /// # Errors
    ///
    /// [`TrackingError::ProductNotFound`] for unknown credentials,
    /// [`TrackingError::TokenInvalid`] for an undecodable token.
    pub fn login(&self, auth: ConsoleAuth<'_>, client_ip: &str) -> TrackingResult<LoginGrant> {
        let product = self
            .find_product(&auth)?
            .ok_or(TrackingError::ProductNotFound)?;
        let token = self.decrypt(auth.token, &product)?;

        let (user, new_user) = self
            .store
            .find_or_create_user(User::for_mac(&token.mac_address))?;
        if new_user {
            info!(user = %user.user_handle, "new user created");
        }

        let session_id = self.open_session(&token, &user, &product, client_ip)?;

        info!(
            user = %user.user_handle,
            product = %product.name,
            env = %product.environment,
            "login successful"
        );
        Ok(LoginGrant {
            product_id: product.product_handle,
            user_id: user.user_handle,
            session_id,
            new_user,
        })
    }

    /// Records a telemetry tag for an open session.
    ///
    /// # Errors
    ///
    /// [`TrackingError::ProductNotFound`] for an unknown product handle,
    /// [`TrackingError::UserOrSessionNotFound`] when the client must log in
    /// again.
    pub fn track(&self, event: &TagEvent<'_>) -> TrackingResult<()> {
        let product_handle = Handle::parse(event.product_id)
            .map_err(|_| TrackingError::ProductNotFound)?;
        let product = self
            .store
            .find_product_by_handle(&product_handle)?
            .ok_or(TrackingError::ProductNotFound)?;

        let user_handle = Handle::parse(event.user_id)
            .map_err(|_| TrackingError::UserOrSessionNotFound)?;
        self.store
            .find_user(&user_handle)?
            .ok_or(TrackingError::UserOrSessionNotFound)?;

        let session_handle = Handle::parse(event.session_id)
            .map_err(|_| TrackingError::UserOrSessionNotFound)?;
        self.store
            .find_session(&session_handle)?
            .ok_or(TrackingError::UserOrSessionNotFound)?;

        self.store.insert_tag(Tag {
            name: event.tag.to_string(),
            attributes: event.attributes.to_string(),
            delta: event.delta,
            sequence: event.sequence,
            session_handle,
            product_handle,
            environment: event.env,
            created_at: Utc::now(),
        })?;

        info!(tag = event.tag, env = %event.env, product = %product.name, "tag received");
        Ok(())
    }

    /// Redeems an unlock key for the console named by the token.
    ///
    /// Unknown product credentials are reported as
    /// [`TrackingError::TokenInvalid`].
    ///
    /// # Errors
    ///
    /// [`TrackingError::InvalidKeyFormat`], [`TrackingError::TokenInvalid`],
    /// [`TrackingError::KeyNotFound`] or [`TrackingError::AlreadyActivated`].
    pub fn activate_key(&self, auth: ConsoleAuth<'_>, key: &str) -> TrackingResult<Grant> {
        let code = KeyCode::parse(key)?;

        let Some(product) = self.find_product(&auth)? else {
            warn!(product_code = auth.product_code, env = auth.env, "product not found");
            return Err(TrackingError::TokenInvalid);
        };
        let token = self.decrypt(auth.token, &product)?;

        let env = product.environment;
        let grant = activate_code(&self.store, &code, env, &token.mac_address)?;
        info!(key = %code, env = %env, product = %product.name, "key activated");
        Ok(grant)
    }

    /// Inserts a session for this login. Handles embed the current millisecond,
    /// so a collision with a concurrent login moves to the next one.
    fn open_session(
        &self,
        token: &Token,
        user: &User,
        product: &Product,
        client_ip: &str,
    ) -> TrackingResult<Handle> {
        const MAX_ATTEMPTS: i64 = 4;

        let now = Utc::now();
        let millis = now.timestamp_millis();
        for offset in 0..MAX_ATTEMPTS {
            let session = Session {
                session_handle: session_handle(
                    &token.mac_address,
                    millis + offset,
                    &product.product_handle,
                ),
                user_mac: token.mac_address.clone(),
                user_handle: user.user_handle.clone(),
                ipv4: client_ip.to_string(),
                product_handle: product.product_handle.clone(),
                environment: product.environment,
                created_at: now,
            };
            let handle = session.session_handle.clone();
            match self.store.insert_session(session) {
                Ok(()) => return Ok(handle),
                Err(StoreError::Duplicate(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(TrackingError::StoreFailure("session handle collision".to_string()))
    }

    fn find_product(&self, auth: &ConsoleAuth<'_>) -> TrackingResult<Option<Product>> {
        let Ok(env) = auth.env.parse::<Environment>() else {
            return Ok(None);
        };
        Ok(self
            .store
            .find_product(auth.product_code, auth.product_password, env)?)
    }

    fn decrypt(&self, token: &str, product: &Product) -> TrackingResult<Token> {
        Ok(self.cipher.decrypt(token, Some(product.token.as_str()))?)
    }
}
