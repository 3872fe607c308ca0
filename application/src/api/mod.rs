//! GraphQL API definitions.

pub mod listing;
mod mutation;
mod query;
pub mod scalar;
mod subscription;
pub mod viewer;

pub use self::{
    listing::Listing, mutation::Mutation, query::Query,
    subscription::Subscription, viewer::Viewer,
};

/// GraphQL schema.
pub type Schema = juniper::RootNode<'static, Query, Mutation, Subscription>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use axum::extract::FromRequestParts as _;
    use common::DateTime;
    use jsonwebtoken::{DecodingKey, EncodingKey, Header};
    use service::{
        command::authorize_user::Claims, domain::user, infra::Memory, task,
    };

    use crate::{Context, Service, Store};

    use super::{Mutation, Query, Schema, Subscription};

    const SECRET: &[u8] = b"secret";

    async fn context(email: &str, email_verified: bool) -> Context {
        let service = Service::new(
            service::Config {
                jwt_decoding_key: DecodingKey::from_secret(SECRET),
                allowed_email_domain: Some("lion.lmu.edu".into()),
                store_timeout: Duration::from_secs(10),
                expire_listings: task::expire_listings::Config::default(),
            },
            Store::from(Memory::new()),
        )
        .0;
        let token = jsonwebtoken::encode(
            &Header::default(),
            &Claims {
                sub: user::Id::new(email).unwrap(),
                email_verified,
                exp: DateTime::now().coerce() + Duration::from_secs(3600),
            },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();
        let (mut parts, ()) = http::Request::builder()
            .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
            .extension(service)
            .body(())
            .unwrap()
            .into_parts();

        Context::from_request_parts(&mut parts, &()).await.unwrap()
    }

    async fn error_code(query: &str, ctx: &Context) -> Option<String> {
        let schema = Schema::new(Query, Mutation, Subscription);
        let (_, errors) = juniper::execute(
            query,
            None,
            &schema,
            &juniper::Variables::new(),
            ctx,
        )
        .await
        .unwrap();
        errors.first().and_then(|e| {
            e.error()
                .extensions()
                .as_object_value()?
                .get_field_value("code")?
                .as_string_value()
                .map(ToOwned::to_owned)
        })
    }

    #[tokio::test]
    async fn unverified_viewer_sees_only_itself() {
        let ctx = context("al@lion.lmu.edu", false).await;

        assert_eq!(error_code("{ me { isVerified } }", &ctx).await, None);
        assert_eq!(
            error_code("{ listings { id } }", &ctx).await.as_deref(),
            Some("EMAIL_NOT_VERIFIED"),
        );
        assert_eq!(
            error_code(
                "{ listing(id: \"67e55044-10b1-426f-9247-bb680e5fe0c8\") \
                   { id } }",
                &ctx,
            )
            .await
            .as_deref(),
            Some("EMAIL_NOT_VERIFIED"),
        );
    }

    #[tokio::test]
    async fn verified_viewer_browses_listings() {
        let ctx = context("al@lion.lmu.edu", true).await;

        assert_eq!(
            error_code("{ listings { id membership } }", &ctx).await,
            None,
        );
    }
}
