//! [`Command`] for authorizing a [`User`].

use derive_more::{Display, Error, From};
use jsonwebtoken::{Algorithm, Validation};
use serde::{Deserialize, Serialize};
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, Session},
        User,
    },
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`] by the [`user::Token`] issued by the
/// identity provider.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUser {
    /// [`user::Token`] to authorize.
    pub token: user::Token,
}

/// Claims of a [`user::Token`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Claims {
    /// E-mail of the [`User`].
    pub sub: user::Id,

    /// Indicator whether the [`User`] has verified its e-mail.
    #[serde(default)]
    pub email_verified: bool,

    /// [`DateTime`] when the [`user::Token`] expires, as a Unix timestamp.
    ///
    /// [`DateTime`]: common::DateTime
    #[serde(with = "common::datetime::serde::unix_timestamp")]
    pub exp: user::ExpirationDateTime,
}

impl<Db> Command<AuthorizeUser> for Service<Db> {
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: AuthorizeUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUser { token } = cmd;

        let Claims {
            sub,
            email_verified,
            exp,
        } = jsonwebtoken::decode::<Claims>(
            token.as_ref(),
            &self.config().jwt_decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?
        .claims;

        if let Some(domain) = &self.config().allowed_email_domain {
            if !sub.is_of_domain(domain) {
                return Err(tracerr::new!(E::ForeignEmailDomain(sub)));
            }
        }

        Ok(Session {
            user: User {
                id: sub,
                is_verified: email_verified,
            },
            expires_at: exp,
        })
    }
}

/// Error of [`AuthorizeUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),

    /// [`User`] e-mail is outside of the allowed domain.
    #[display("`User(id: {_0})` is outside of the allowed e-mail domain")]
    #[from(ignore)]
    ForeignEmailDomain(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;
    use jsonwebtoken::{EncodingKey, Header};

    use crate::{command::Command as _, domain::user, infra::Memory, Service};

    use super::{AuthorizeUser, Claims, ExecutionError};

    fn token(email: &str, email_verified: bool, ttl: i64) -> user::Token {
        let claims = Claims {
            sub: user::Id::new(email).unwrap(),
            email_verified,
            exp: user::ExpirationDateTime::from_unix_timestamp(
                DateTime::now().unix_timestamp() + ttl,
            )
            .unwrap(),
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(crate::spec::JWT_SECRET),
        )
        .unwrap()
        .into()
    }

    #[tokio::test]
    async fn authorizes_campus_user() {
        let (svc, _bg) = Service::new(crate::spec::config(), Memory::new());

        let session = svc
            .execute(AuthorizeUser::from(token("Al@Lion.lmu.edu", true, 3600)))
            .await
            .unwrap();

        assert_eq!(session.user.id.to_string(), "al@lion.lmu.edu");
        assert!(session.user.is_verified);

        let session = svc
            .execute(AuthorizeUser::from(token("bo@lion.lmu.edu", false, 60)))
            .await
            .unwrap();
        assert!(!session.user.is_verified);
    }

    #[tokio::test]
    async fn rejects_foreign_domain() {
        let (svc, _bg) = Service::new(crate::spec::config(), Memory::new());

        let err = svc
            .execute(AuthorizeUser::from(token("al@gmail.com", true, 3600)))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::ForeignEmailDomain(_)));
    }

    #[tokio::test]
    async fn rejects_expired_or_forged_token() {
        let (svc, _bg) = Service::new(crate::spec::config(), Memory::new());

        let err = svc
            .execute(AuthorizeUser::from(token("al@lion.lmu.edu", true, -3600)))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::JsonWebTokenDecodeError(_),
        ));

        let forged = jsonwebtoken::encode(
            &Header::default(),
            &Claims {
                sub: user::Id::new("al@lion.lmu.edu").unwrap(),
                email_verified: true,
                exp: DateTime::now().coerce() + Duration::from_secs(3600),
            },
            &EncodingKey::from_secret(b"another secret"),
        )
        .unwrap();
        let err = svc
            .execute(AuthorizeUser::from(user::Token::from(forged)))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::JsonWebTokenDecodeError(_),
        ));
    }
}
