//! [`Listing`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Select, Subscribe};
use futures::{channel::mpsc, future, stream, FutureExt as _, StreamExt as _};
use tokio_postgres::{AsyncMessage, NoTls, Row};
use tracerr::Traced;

use crate::{
    domain::{listing, user, Listing},
    infra::{
        database::{
            self,
            postgres::{self, Connection, LISTINGS_CHANNEL},
            Postgres, Snapshots,
        },
        Database,
    },
};

/// Columns of the `listings` table forming a [`Listing`].
const COLUMNS: &str = "\
    id, header, body, kind, owner, member_limit, members, \
    scheduled_start, scheduled_end, created_at";

/// Ordering of the selected [`Listing`]s: newest first, with legacy rows
/// missing their creation time sorting as the oldest.
const NEWEST_FIRST: &str = "created_at DESC NULLS LAST, id";

/// Converts the provided [`Row`] into a [`Listing`].
fn listing_from(row: &Row) -> Listing {
    Listing {
        id: row.get("id"),
        header: row.get("header"),
        body: row.get("body"),
        kind: row.get("kind"),
        owner: row.get("owner"),
        member_limit: listing::MemberLimit::new(
            row.get::<_, i16>("member_limit").into(),
        )
        .expect("`member_limit` out of range"),
        members: row
            .get::<_, Vec<user::Id>>("members")
            .into_iter()
            .collect(),
        schedule: row
            .get::<_, Option<listing::StartDateTime>>("scheduled_start")
            .zip(row.get("scheduled_end"))
            .and_then(|(start, end)| listing::Schedule::new(start, end)),
        created_at: row.get("created_at"),
    }
}

impl Database<Insert<listing::Draft>> for Postgres {
    type Ok = listing::Id;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(draft): Insert<listing::Draft>,
    ) -> Result<Self::Ok, Self::Err> {
        let listing::Draft {
            header,
            body,
            kind,
            owner,
            member_limit,
            schedule,
        } = draft;
        let member_limit = i16::from(member_limit.get());
        let start = schedule.map(|s| s.start());
        let end = schedule.map(|s| s.end());

        const SQL: &str = "\
            INSERT INTO listings (header, body, kind, owner, member_limit, \
                                  scheduled_start, scheduled_end) \
            VALUES ($1::TEXT, $2::TEXT, $3::INT2, $4::TEXT, $5::INT2, \
                    $6::TIMESTAMPTZ, $7::TIMESTAMPTZ) \
            RETURNING id";
        Ok(self
            .query_one(
                SQL,
                &[
                    &header,
                    &body,
                    &kind,
                    &owner,
                    &member_limit,
                    &start,
                    &end,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?
            .get("id"))
    }
}

impl Database<Insert<listing::NewMember>> for Postgres {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(member): Insert<listing::NewMember>,
    ) -> Result<Self::Ok, Self::Err> {
        let listing::NewMember {
            listing_id,
            user_id,
        } = member;

        // Set-union, never duplicating a member.
        const SQL: &str = "\
            UPDATE listings \
            SET members = CASE WHEN $2::TEXT = ANY(members) \
                               THEN members \
                               ELSE array_append(members, $2::TEXT) \
                          END \
            WHERE id = $1::UUID";
        Ok(self
            .exec(SQL, &[&listing_id, &user_id])
            .await
            .map_err(tracerr::wrap!())?
            > 0)
    }
}

impl Database<Select<By<Vec<Listing>, ()>>> for Postgres {
    type Ok = Vec<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<Listing>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sql = format!(
            "SELECT {COLUMNS} \
             FROM listings \
             ORDER BY {NEWEST_FIRST}",
        );
        Ok(self
            .query(sql.as_str(), &[])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(listing_from)
            .collect())
    }
}

impl Database<Select<By<Option<Listing>, listing::Id>>> for Postgres {
    type Ok = Option<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Listing>, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM listings \
             WHERE id = $1::UUID",
        );
        Ok(self
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(listing_from))
    }
}

impl Database<Delete<By<Vec<Listing>, listing::EndDateTime>>> for Postgres {
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Vec<Listing>, listing::EndDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ended_before = by.into_inner();

        const SQL: &str = "\
            DELETE FROM listings \
            WHERE scheduled_end < $1::TIMESTAMPTZ";
        self.exec(SQL, &[&ended_before])
            .await
            .map_err(tracerr::wrap!())
    }
}

impl Database<Subscribe<By<Vec<Listing>, ()>>> for Postgres {
    type Ok = Snapshots;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Subscribe<By<Vec<Listing>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        // `LISTEN` is bound to a session, so it needs its own connection.
        let (listener, mut connection) = self
            .listener
            .connect(NoTls)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)?;

        let (tx, rx) = mpsc::unbounded();
        drop(tokio::spawn(
            stream::poll_fn(move |cx| connection.poll_message(cx))
                .map(Ok)
                .forward(tx)
                .map(drop),
        ));

        listener
            .batch_execute(&format!("LISTEN {LISTINGS_CHANNEL}"))
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)?;

        let changes = rx.filter_map(|msg| {
            future::ready(match msg {
                Ok(AsyncMessage::Notification(_)) => Some(Ok(())),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
        });

        let db = self.clone();
        Ok(stream::once(future::ready(Ok(())))
            .chain(changes)
            .then(move |change| {
                // Listening lasts as long as this closure.
                let _listener = &listener;
                let db = db.clone();
                async move {
                    change
                        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                        .map_err(tracerr::map_from)?;
                    db.execute(Select(By::<Vec<Listing>, _>::new(())))
                        .await
                        .map_err(tracerr::wrap!())
                }
            })
            .boxed())
    }
}

#[cfg(test)]
mod spec {
    use super::NEWEST_FIRST;

    #[test]
    fn sorts_missing_creation_last() {
        assert!(NEWEST_FIRST.starts_with("created_at DESC NULLS LAST"));
    }
}
