use std::fmt;

use actix_web::dev::ServiceRequest;
use actix_web::{Error, web};
use actix_web_httpauth::extractors::AuthenticationError;
use actix_web_httpauth::extractors::basic::{BasicAuth, Config};

/// Credentials Label Studio is configured to send to the backend.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuthConfig {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for BasicAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthConfig")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

impl BasicAuthConfig {
    pub fn accepts(&self, credentials: &BasicAuth) -> bool {
        credentials.user_id() == self.user && credentials.password() == Some(self.password.as_str())
    }
}

/// Validator for `HttpAuthentication::basic`, reading the expected credentials
/// from `web::Data<BasicAuthConfig>`.
pub async fn basic_auth_validator(
    req: ServiceRequest,
    credentials: BasicAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let accepted = req
        .app_data::<web::Data<BasicAuthConfig>>()
        .is_some_and(|config| config.accepts(&credentials));

    if accepted {
        Ok(req)
    } else {
        log::warn!("Rejected credentials for user '{}' on {}", credentials.user_id(), req.path());
        let challenge = Config::default().realm("ml-backend");
        Err((AuthenticationError::from(challenge).into(), req))
    }
}
